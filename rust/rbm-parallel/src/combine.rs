//! Per-key combination of a batch of containers.

use std::sync::Arc;

use rbm_bitmap::Container;

use crate::repair::{repair_after_lazy, upgrade_to_bitmap};

/// Union of two or more containers: upgrade the first, lazily OR the rest in
/// order, then repair once.
///
/// # Panics
///
/// Panics if fewer than two containers are given. Single containers are
/// passed through by the caller and never reach this path.
pub fn union_containers(containers: &[Arc<Container>]) -> Container {
    assert!(
        containers.len() >= 2,
        "union batch holds {} containers",
        containers.len()
    );
    let mut acc = upgrade_to_bitmap(&containers[0]);
    for container in &containers[1..] {
        acc.lazy_ior(container);
    }
    repair_after_lazy(&mut acc);
    acc
}

/// Exact intersection of two or more containers: `and` of the first pair,
/// then `iand` with each remaining container. The result may be empty.
///
/// # Panics
///
/// Panics if fewer than two containers are given.
pub fn intersect_containers(containers: &[Arc<Container>]) -> Container {
    assert!(
        containers.len() >= 2,
        "intersection batch holds {} containers",
        containers.len()
    );
    let mut acc = containers[0].and(&containers[1]);
    for container in &containers[2..] {
        if acc.is_empty() {
            break;
        }
        acc.iand(container);
    }
    acc
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, sync::Arc};

    use rbm_bitmap::{
        Container, ContainerKind,
        container::{
            ARRAY_MAX_SIZE,
            run::{Run, RunContainer},
        },
    };

    use super::{intersect_containers, union_containers};

    fn random_container(max_len: usize) -> Arc<Container> {
        let values = (0..fastrand::usize(1..max_len))
            .map(|_| fastrand::u16(..))
            .collect::<BTreeSet<_>>();
        Arc::new(Container::from_sorted_values(values.into_iter().collect()))
    }

    #[test]
    fn test_union_matches_set_union() {
        fastrand::seed(20240611);
        for _ in 0..20 {
            let containers = (0..fastrand::usize(2..6))
                .map(|_| random_container(3000))
                .collect::<Vec<_>>();
            let expected = containers
                .iter()
                .flat_map(|container| container.iter())
                .collect::<BTreeSet<_>>();

            let result = union_containers(&containers);
            assert_eq!(result.iter().collect::<BTreeSet<_>>(), expected);
            assert_eq!(result.cardinality(), expected.len());
            match result.kind() {
                ContainerKind::Array => assert!(expected.len() <= ARRAY_MAX_SIZE),
                ContainerKind::Bitmap => assert!(expected.len() > ARRAY_MAX_SIZE),
                ContainerKind::Run => assert!(result.is_full()),
            }
        }
    }

    #[test]
    fn test_union_reaching_full() {
        let containers = [
            Arc::new(Container::Run(RunContainer::new(vec![Run::new(0, 30000)]))),
            Arc::new(Container::from_sorted_values((30001..=40000).collect())),
            Arc::new(Container::Run(RunContainer::new(vec![Run::new(40001, u16::MAX)]))),
        ];
        let result = union_containers(&containers);
        assert_eq!(result.kind(), ContainerKind::Run);
        assert!(result.is_full());
    }

    #[test]
    fn test_union_with_full_first() {
        let containers = [Arc::new(Container::full()), random_container(100)];
        let result = union_containers(&containers);
        assert!(result.is_full());
        assert_eq!(result.kind(), ContainerKind::Run);
    }

    #[test]
    #[should_panic]
    fn test_union_requires_two() {
        union_containers(&[Arc::new(Container::full())]);
    }

    #[test]
    fn test_intersection_matches_set_intersection() {
        fastrand::seed(1234567);
        for _ in 0..20 {
            let containers = (0..fastrand::usize(2..5))
                .map(|_| random_container(40000))
                .collect::<Vec<_>>();
            let mut expected = containers[0].iter().collect::<BTreeSet<_>>();
            for container in &containers[1..] {
                expected.retain(|&value| container.contains(value));
            }

            let result = intersect_containers(&containers);
            assert_eq!(result.iter().collect::<BTreeSet<_>>(), expected);
            assert_eq!(result.cardinality(), expected.len());
        }
    }

    #[test]
    fn test_intersection_small_example() {
        let containers = [
            Arc::new(Container::from_sorted_values(vec![1, 2, 3])),
            Arc::new(Container::from_sorted_values(vec![2, 3, 4])),
            Arc::new(Container::from_sorted_values(vec![2, 5])),
        ];
        let result = intersect_containers(&containers);
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![2]);
    }
}
