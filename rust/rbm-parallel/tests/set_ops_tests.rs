use std::{collections::BTreeSet, sync::Arc};

use rbm_bitmap::{Bitmap, Container, ContainerKind, container::bitmap::BitmapContainer};
use rbm_parallel::{ParConfig, horizontal_or, par_and, par_and_default, par_or, par_or_default};
use roaring::RoaringBitmap;

fn random_container(count: usize) -> Container {
    let values = (0..count)
        .map(|_| fastrand::u16(..))
        .collect::<BTreeSet<_>>();
    Container::from_sorted_values(values.into_iter().collect())
}

/// A bitmap mixing sparse, dense and run-encoded containers over `keys` keys.
fn random_bitmap(keys: u16) -> Bitmap {
    let containers = (0..keys).filter_map(|key| {
        let container = match fastrand::u8(0..5) {
            0 => return None,
            1 => random_container(fastrand::usize(1..500)),
            2 => random_container(fastrand::usize(5000..40000)),
            3 => {
                let start = fastrand::u16(0..60000);
                let end = start + fastrand::u16(0..5000);
                Container::from_sorted_values((start..=end).collect())
            }
            _ => Container::Bitmap(BitmapContainer::full()),
        };
        Some((key, container))
    });
    let mut bitmap = Bitmap::try_from_containers(containers).unwrap();
    if fastrand::bool() {
        bitmap.run_optimize();
    }
    bitmap
}

fn to_roaring(bitmap: &Bitmap) -> RoaringBitmap {
    bitmap.iter().collect()
}

fn config() -> ParConfig {
    ParConfig::default().with_worker_count(4)
}

fn assert_canonical(bitmap: &Bitmap) {
    assert!(bitmap.keys().windows(2).all(|pair| pair[0] < pair[1]));
    for index in 0..bitmap.container_count() {
        let container = bitmap.container_at(index);
        assert!(!container.is_empty());
        if bitmap.is_copy_on_write(index) {
            continue;
        }
        let cardinality = container.cardinality();
        match container {
            Container::Array(_) => assert!(cardinality <= 4096),
            Container::Bitmap(bits) => {
                assert!(bits.known_cardinality().is_some());
                assert!(cardinality > 4096);
            }
            Container::Run(_) => (),
        }
    }
}

#[test]
fn test_union_matches_reference() {
    fastrand::seed(1001);
    for round in 0..8 {
        let bitmaps = (0..fastrand::usize(2..6))
            .map(|_| random_bitmap(16))
            .collect::<Vec<_>>();
        let expected = bitmaps
            .iter()
            .map(to_roaring)
            .fold(RoaringBitmap::new(), |acc, b| acc | b);

        let result = par_or(&bitmaps, &config());
        assert_eq!(to_roaring(&result), expected, "round {round}");
        assert_eq!(result.cardinality(), expected.len());
        assert_canonical(&result);
        assert_eq!(horizontal_or(&bitmaps), result);
    }
}

#[test]
fn test_intersection_matches_reference() {
    fastrand::seed(1002);
    for round in 0..8 {
        let bitmaps = (0..fastrand::usize(2..6))
            .map(|_| random_bitmap(12))
            .collect::<Vec<_>>();
        let expected = bitmaps
            .iter()
            .map(to_roaring)
            .reduce(|acc, b| acc & b)
            .unwrap();

        let result = par_and(&bitmaps, &config());
        assert_eq!(to_roaring(&result), expected, "round {round}");
        assert_eq!(result.cardinality(), expected.len());
        assert_canonical(&result);
    }
}

#[test]
fn test_order_independence() {
    fastrand::seed(1003);
    let mut bitmaps = (0..5).map(|_| random_bitmap(16)).collect::<Vec<_>>();
    let union = par_or(&bitmaps, &config());
    let intersection = par_and(&bitmaps, &config());

    for _ in 0..4 {
        fastrand::shuffle(&mut bitmaps);
        assert_eq!(par_or(&bitmaps, &config()), union);
        assert_eq!(par_and(&bitmaps, &config()), intersection);
    }
}

#[test]
fn test_identity() {
    fastrand::seed(1004);
    assert!(par_or(&[], &config()).is_empty());
    assert!(par_and(&[], &config()).is_empty());

    let a = random_bitmap(16);
    let inputs = [a.clone()];
    let union = par_or(&inputs, &config());
    let intersection = par_and(&inputs, &config());
    assert_eq!(union, a);
    assert_eq!(intersection, a);
    assert_eq!(union.keys(), a.keys());
    for index in 0..union.container_count() {
        assert!(union.is_copy_on_write(index));
        assert!(Arc::ptr_eq(
            &union.shared_container_at(index),
            &inputs[0].shared_container_at(index)
        ));
    }
}

#[test]
fn test_absorption() {
    fastrand::seed(1005);
    let a = random_bitmap(16);
    let empty = Bitmap::new();
    assert_eq!(par_or(&[a.clone(), empty.clone()], &config()), a);
    assert_eq!(par_or(&[empty.clone(), a.clone()], &config()), a);
    assert!(par_and(&[a.clone(), empty.clone()], &config()).is_empty());
    assert!(par_and(&[empty, a], &config()).is_empty());
}

#[test]
fn test_idempotence() {
    fastrand::seed(1006);
    let a = random_bitmap(16);
    let doubled = [a.clone(), a.clone()];
    let union = par_or(&doubled, &config());
    let intersection = par_and(&doubled, &config());
    assert_eq!(union, a);
    assert_eq!(intersection, a);
    assert_eq!(union.keys(), a.keys());
    assert_canonical(&union);
}

#[test]
fn test_key_disjoint_union() {
    let a = (0..5u32)
        .flat_map(|key| [(key * 2) << 16, ((key * 2) << 16) | 99])
        .collect::<Bitmap>();
    let b = (0..5u32)
        .flat_map(|key| [((key * 2 + 1) << 16) | 1])
        .collect::<Bitmap>();
    let inputs = [a, b];
    let result = par_or(&inputs, &config());

    assert_eq!(
        result.container_count(),
        inputs[0].container_count() + inputs[1].container_count()
    );
    for index in 0..result.container_count() {
        assert!(result.is_copy_on_write(index));
        let key = result.key_at(index);
        let source = &inputs[(key % 2) as usize];
        let source_index = source.keys().binary_search(&key).unwrap();
        assert!(Arc::ptr_eq(
            &result.shared_container_at(index),
            &source.shared_container_at(source_index)
        ));
    }
}

#[test]
fn test_full_intersection_only() {
    let a = [1u32, 2, 3].into_iter().collect::<Bitmap>();
    let b = [2u32, 3, 4].into_iter().collect::<Bitmap>();
    let c = [2u32, 5].into_iter().collect::<Bitmap>();
    let d = [(7u32 << 16) | 2].into_iter().collect::<Bitmap>();

    assert_eq!(par_and(&[a.clone(), b.clone(), c.clone()], &config()).to_vec(), vec![2]);
    assert!(par_and(&[a, b, c, d], &config()).is_empty());
}

#[test]
fn test_keys_missing_from_one_input_are_dropped() {
    let a = [1u32, 1 << 16, 2 << 16].into_iter().collect::<Bitmap>();
    let b = [1u32, 2 << 16].into_iter().collect::<Bitmap>();
    let result = par_and(&[a, b], &config());
    assert_eq!(result.keys(), &[0, 2]);
    assert_eq!(result.to_vec(), vec![1, 2 << 16]);
}

#[test]
fn test_union_repair_encodings() {
    let low = (0..40000u32).collect::<Bitmap>();
    let high = (40000..65536u32).chain([70000]).collect::<Bitmap>();
    let sparse_a = [(2u32 << 16) | 1].into_iter().collect::<Bitmap>();
    let sparse_b = [(2u32 << 16) | 2].into_iter().collect::<Bitmap>();
    let result = par_or(&[low, high, sparse_a, sparse_b], &config());

    assert_eq!(result.keys(), &[0, 1, 2]);
    let full = result.container_at(0);
    assert_eq!(full.kind(), ContainerKind::Run);
    assert!(full.is_full());
    assert!(!result.is_copy_on_write(0));
    assert!(result.is_copy_on_write(1));
    assert_eq!(result.container_at(2).kind(), ContainerKind::Array);
    assert_eq!(result.container_at(2).cardinality(), 2);
    assert_eq!(result.cardinality(), 65536 + 1 + 2);
}

#[test]
fn test_determinism_across_runs() {
    fastrand::seed(1007);
    let bitmaps = (0..6).map(|_| random_bitmap(24)).collect::<Vec<_>>();
    let union = par_or(&bitmaps, &config());
    let intersection = par_and(&bitmaps[..3], &config());
    for workers in [1, 2, 7, 16] {
        let config = ParConfig::default()
            .with_worker_count(workers)
            .with_work_queue_capacity(workers);
        let repeat = par_or(&bitmaps, &config);
        assert_eq!(repeat, union);
        assert_eq!(repeat.keys(), union.keys());
        assert_eq!(par_and(&bitmaps[..3], &config), intersection);
    }
}

#[test]
fn test_default_config_wrappers() {
    fastrand::seed(1008);
    let bitmaps = (0..3).map(|_| random_bitmap(16)).collect::<Vec<_>>();
    assert_eq!(par_or_default(&bitmaps), horizontal_or(&bitmaps));
    assert_eq!(par_and_default(&bitmaps), par_and(&bitmaps, &config()));
}
