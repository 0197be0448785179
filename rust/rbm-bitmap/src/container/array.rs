//! Sparse container storing its values as a sorted list.

use crate::container::{SPAN, bitmap::BitmapContainer, run::RunContainer};

/// A container that stores its values explicitly, as a sorted vector of
/// `u16` offsets.
///
/// Each value costs 2 bytes, which beats the fixed 8 KiB of a
/// [`BitmapContainer`] up to [`ARRAY_MAX_SIZE`](crate::container::ARRAY_MAX_SIZE)
/// values. Containers produced by exact operations are kept within that limit;
/// the type itself does not enforce it.
///
/// # Invariants
///
/// - **Sorted**: values are in strictly ascending order
/// - **Unique**: no value appears twice
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrayContainer {
    values: Vec<u16>,
}

impl ArrayContainer {
    pub fn new(values: Vec<u16>) -> ArrayContainer {
        let container = ArrayContainer { values };
        #[cfg(debug_assertions)]
        container.check_invariants();
        container
    }

    pub fn empty() -> ArrayContainer {
        ArrayContainer { values: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    /// Counts maximal runs of consecutive values.
    ///
    /// Values `[0, 1, 2, 4, 5, 9]` contain 3 runs: `[0-2]`, `[4-5]` and `[9]`.
    pub fn count_runs(&self) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        1 + self
            .values
            .windows(2)
            .filter(|pair| pair[1] != pair[0] + 1)
            .count()
    }

    /// Merge-based intersection of two sorted lists.
    pub fn intersect(&self, other: &ArrayContainer) -> ArrayContainer {
        // Intersection cannot have more elements than the smaller input.
        let mut out = Vec::with_capacity(self.values.len().min(other.values.len()));

        let mut i = 0;
        let mut j = 0;
        while i < self.values.len() && j < other.values.len() {
            match self.values[i].cmp(&other.values[j]) {
                std::cmp::Ordering::Equal => {
                    out.push(self.values[i]);
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }

        out.shrink_to_fit();
        ArrayContainer { values: out }
    }

    /// Returns the values for which `keep` holds.
    pub fn filter(&self, mut keep: impl FnMut(u16) -> bool) -> ArrayContainer {
        let values = self
            .values
            .iter()
            .copied()
            .filter(|&value| keep(value))
            .collect();
        ArrayContainer { values }
    }

    /// Drops the values for which `keep` does not hold.
    pub fn retain(&mut self, mut keep: impl FnMut(u16) -> bool) {
        self.values.retain(|&value| keep(value));
    }

    pub fn to_bitmap_container(&self) -> BitmapContainer {
        BitmapContainer::from_values(&self.values)
    }

    pub fn to_run_container(&self) -> RunContainer {
        RunContainer::from_values(&self.values)
    }

    pub fn check_invariants(&self) {
        assert!(self.values.len() <= SPAN);
        assert!(self.values.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
