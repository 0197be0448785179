//! The ordered container registry backing a bitmap.

use std::sync::Arc;

use itertools::Itertools;
use rbm_common::{Result, verify_arg};

use crate::container::Container;

/// A set of `u32` values, split by their high 16 bits (the key) into
/// containers holding the low 16 bits.
///
/// # Invariants
///
/// - Keys are strictly ascending.
/// - `keys`, `containers` and `copy_on_write` have the same length.
/// - A container flagged copy-on-write may be referenced by another bitmap and
///   is cloned before any in-place mutation.
#[derive(Clone, Default)]
pub struct Bitmap {
    keys: Vec<u16>,
    containers: Vec<Arc<Container>>,
    copy_on_write: Vec<bool>,
}

impl Bitmap {
    pub fn new() -> Bitmap {
        Bitmap::default()
    }

    pub fn with_capacity(container_count: usize) -> Bitmap {
        Bitmap {
            keys: Vec::with_capacity(container_count),
            containers: Vec::with_capacity(container_count),
            copy_on_write: Vec::with_capacity(container_count),
        }
    }

    /// Builds a bitmap from strictly increasing values.
    pub fn from_sorted_iter(values: impl IntoIterator<Item = u32>) -> Result<Bitmap> {
        let mut bitmap = Bitmap::new();
        let chunks = values.into_iter().chunk_by(|&value| (value >> 16) as u16);
        for (key, chunk) in &chunks {
            let low = chunk.map(|value| value as u16).collect::<Vec<_>>();
            verify_arg!(values, low.windows(2).all(|pair| pair[0] < pair[1]));
            bitmap.try_append_container(key, Arc::new(Container::from_sorted_values(low)), false)?;
        }
        Ok(bitmap)
    }

    /// Assembles a bitmap from owned `(key, container)` pairs in ascending key
    /// order. Empty containers are skipped.
    pub fn try_from_containers(
        containers: impl IntoIterator<Item = (u16, Container)>,
    ) -> Result<Bitmap> {
        let mut bitmap = Bitmap::new();
        for (key, container) in containers {
            if !container.is_empty() {
                bitmap.try_append_container(key, Arc::new(container), false)?;
            }
        }
        Ok(bitmap)
    }

    /// Number of containers (distinct keys).
    #[inline]
    pub fn container_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> &[u16] {
        &self.keys
    }

    #[inline]
    pub fn key_at(&self, index: usize) -> u16 {
        self.keys[index]
    }

    #[inline]
    pub fn container_at(&self, index: usize) -> &Container {
        &self.containers[index]
    }

    /// Returns a second reference to the container at `index`. The receiving
    /// bitmap must append it as copy-on-write.
    #[inline]
    pub fn shared_container_at(&self, index: usize) -> Arc<Container> {
        self.containers[index].clone()
    }

    #[inline]
    pub fn is_copy_on_write(&self, index: usize) -> bool {
        self.copy_on_write[index]
    }

    /// Returns the container at `index` for in-place mutation, cloning it
    /// first if it is still referenced elsewhere.
    pub fn writable_container_at(&mut self, index: usize) -> &mut Container {
        self.copy_on_write[index] = false;
        Arc::make_mut(&mut self.containers[index])
    }

    /// Appends a container under `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` does not exceed the last key. Use
    /// [`Bitmap::try_append_container`] for untrusted input.
    pub fn append_container(&mut self, key: u16, container: Arc<Container>, copy_on_write: bool) {
        assert!(
            self.keys.last().is_none_or(|&last| last < key),
            "key {key} appended out of order"
        );
        self.keys.push(key);
        self.containers.push(container);
        self.copy_on_write.push(copy_on_write);
    }

    pub fn try_append_container(
        &mut self,
        key: u16,
        container: Arc<Container>,
        copy_on_write: bool,
    ) -> Result<()> {
        verify_arg!(key, self.keys.last().is_none_or(|&last| last < key));
        self.append_container(key, container, copy_on_write);
        Ok(())
    }

    pub fn contains(&self, value: u32) -> bool {
        match self.keys.binary_search(&((value >> 16) as u16)) {
            Ok(index) => self.containers[index].contains(value as u16),
            Err(_) => false,
        }
    }

    pub fn cardinality(&self) -> u64 {
        self.containers
            .iter()
            .map(|container| container.cardinality() as u64)
            .sum()
    }

    /// Iterates over the values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.keys
            .iter()
            .zip(self.containers.iter())
            .flat_map(|(&key, container)| {
                let high = (key as u32) << 16;
                container.iter().map(move |low| high | low as u32)
            })
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Re-encodes every container into its smallest representation.
    pub fn run_optimize(&mut self) {
        for index in 0..self.container_count() {
            self.writable_container_at(index).optimize();
        }
    }
}

impl FromIterator<u32> for Bitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Bitmap {
        let mut values = iter.into_iter().collect::<Vec<_>>();
        values.sort_unstable();
        values.dedup();
        let mut bitmap = Bitmap::new();
        for (key, chunk) in &values.into_iter().chunk_by(|&value| (value >> 16) as u16) {
            let low = chunk.map(|value| value as u16).collect::<Vec<_>>();
            bitmap.append_container(key, Arc::new(Container::from_sorted_values(low)), false);
        }
        bitmap
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Bitmap) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for Bitmap {}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("containers", &self.container_count())
            .field("cardinality", &self.cardinality())
            .finish()
    }
}
