//! Containers hold the low 16 bits of every member under one bitmap key.
//!
//! - Each container covers the fixed value space `[0, SPAN)` (64K values).
//! - Encodings trade space for speed: `Array` (sorted `u16` values), `Bitmap`
//!   (dense bitset), `Run` (sorted inclusive `u16` runs).
//! - Exact operations (`and`, `iand`) always leave a container with a known
//!   cardinality and an array/bitset choice that respects [`ARRAY_MAX_SIZE`].
//! - Lazy operations (`lazy_or`, `lazy_ior`) produce a bitset with an unknown
//!   cardinality; callers normalize the result once a chain of lazy unions is
//!   complete.

use crate::container::{
    array::ArrayContainer,
    bitmap::{BitmapContainer, BitmapIter},
    run::{RunContainer, RunIter},
};

pub mod array;
pub mod bitmap;
pub mod run;

/// Number of distinct low-half values a container can hold.
pub const SPAN: usize = u16::MAX as usize + 1;

/// Largest cardinality kept in the sparse `Array` encoding. Past this point a
/// dense bitset (`SPAN / 8` bytes) is never larger than the array.
pub const ARRAY_MAX_SIZE: usize = 4096;

/// The per-key payload of a [`Bitmap`](crate::Bitmap).
///
/// Overview
/// - `Array`: sparse, at most [`ARRAY_MAX_SIZE`] values when normalized.
/// - `Bitmap`: one bit per value; the cardinality may be unknown after a lazy
///   union.
/// - `Run`: run-length encoding, used for clustered or full containers.
#[derive(Clone, Debug)]
pub enum Container {
    Array(ArrayContainer),
    Bitmap(BitmapContainer),
    Run(RunContainer),
}

/// Identifies the storage encoding used by a `Container`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Bitmap,
    Run,
}

impl Container {
    /// Builds a container from sorted, unique low-half values, picking `Array`
    /// or `Bitmap` by cardinality.
    pub fn from_sorted_values(values: Vec<u16>) -> Container {
        if values.len() <= ARRAY_MAX_SIZE {
            Container::Array(ArrayContainer::new(values))
        } else {
            Container::Bitmap(BitmapContainer::from_values(&values))
        }
    }

    /// A run container covering the whole value space.
    pub fn full() -> Container {
        Container::Run(RunContainer::full())
    }

    #[inline]
    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Array(_) => ContainerKind::Array,
            Container::Bitmap(_) => ContainerKind::Bitmap,
            Container::Run(_) => ContainerKind::Run,
        }
    }

    /// Number of values present.
    ///
    /// A bitset with an unknown cardinality is counted on the fly without
    /// caching the result; see [`Container::compute_cardinality`].
    pub fn cardinality(&self) -> usize {
        match self {
            Container::Array(array) => array.len(),
            Container::Bitmap(bits) => bits.cardinality(),
            Container::Run(runs) => runs.cardinality(),
        }
    }

    /// Recounts the cardinality, caching it in a bitset container.
    pub fn compute_cardinality(&mut self) -> usize {
        match self {
            Container::Bitmap(bits) => bits.compute_cardinality(),
            other => other.cardinality(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        match self {
            Container::Array(array) => array.is_empty(),
            Container::Bitmap(bits) => bits.is_empty(),
            Container::Run(runs) => runs.is_empty(),
        }
    }

    /// Returns `true` if every value in `[0, SPAN)` is present.
    pub fn is_full(&self) -> bool {
        match self {
            Container::Array(array) => array.len() == SPAN,
            Container::Bitmap(bits) => bits.is_full(),
            Container::Run(runs) => runs.is_full(),
        }
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        match self {
            Container::Array(array) => array.contains(value),
            Container::Bitmap(bits) => bits.contains(value),
            Container::Run(runs) => runs.contains(value),
        }
    }

    /// Number of maximal runs of consecutive values.
    pub fn count_runs(&self) -> usize {
        match self {
            Container::Array(array) => array.count_runs(),
            Container::Bitmap(bits) => bits.count_runs(),
            Container::Run(runs) => runs.runs().len(),
        }
    }

    /// Returns an iterator over the values in ascending order.
    pub fn iter(&self) -> ContainerIter<'_> {
        match self {
            Container::Array(array) => ContainerIter::Array(array.values().iter().copied()),
            Container::Bitmap(bits) => ContainerIter::Bitmap(bits.iter()),
            Container::Run(runs) => ContainerIter::Run(runs.iter()),
        }
    }

    pub fn to_array_container(&self) -> ArrayContainer {
        match self {
            Container::Array(array) => array.clone(),
            Container::Bitmap(bits) => bits.to_array_container(),
            Container::Run(runs) => runs.to_array_container(),
        }
    }

    pub fn to_bitmap_container(&self) -> BitmapContainer {
        match self {
            Container::Array(array) => array.to_bitmap_container(),
            Container::Bitmap(bits) => bits.clone(),
            Container::Run(runs) => runs.to_bitmap_container(),
        }
    }

    pub fn to_run_container(&self) -> RunContainer {
        match self {
            Container::Array(array) => array.to_run_container(),
            Container::Bitmap(bits) => bits.to_run_container(),
            Container::Run(runs) => runs.clone(),
        }
    }

    /// Exact intersection.
    ///
    /// The result has a known cardinality. Bitset results at or below
    /// [`ARRAY_MAX_SIZE`] are converted to arrays.
    pub fn and(&self, other: &Container) -> Container {
        match (self, other) {
            (Container::Array(left), Container::Array(right)) => {
                Container::Array(left.intersect(right))
            }
            (Container::Array(array), other) | (other, Container::Array(array)) => {
                Container::Array(array.filter(|value| other.contains(value)))
            }
            (Container::Bitmap(left), Container::Bitmap(right)) => {
                Self::from_dense(left.intersect(right))
            }
            (Container::Run(left), Container::Run(right)) => Container::Run(left.intersect(right)),
            (Container::Run(runs), Container::Bitmap(bits))
            | (Container::Bitmap(bits), Container::Run(runs)) => {
                if runs.is_full() {
                    let mut bits = bits.clone();
                    bits.compute_cardinality();
                    Self::from_dense(bits)
                } else {
                    Self::from_dense(bits.intersect(&runs.to_bitmap_container()))
                }
            }
        }
    }

    /// In-place exact intersection, see [`Container::and`].
    pub fn iand(&mut self, other: &Container) {
        match self {
            Container::Array(array) => array.retain(|value| other.contains(value)),
            Container::Bitmap(bits) => {
                match other {
                    Container::Bitmap(other_bits) => bits.intersect_with(other_bits),
                    Container::Run(runs) if runs.is_full() => {
                        bits.compute_cardinality();
                    }
                    Container::Run(runs) => bits.intersect_with(&runs.to_bitmap_container()),
                    Container::Array(array) => {
                        let filtered = array.filter(|value| bits.contains(value));
                        *self = Container::Array(filtered);
                        return;
                    }
                }
                if bits.cardinality() <= ARRAY_MAX_SIZE {
                    let array = bits.to_array_container();
                    *self = Container::Array(array);
                }
            }
            Container::Run(_) => *self = self.and(other),
        }
    }

    /// Lazy union: the result is a bitset with an unknown cardinality, or a
    /// full run container when `self` is already full.
    pub fn lazy_or(&self, other: &Container) -> Container {
        if self.is_full_run() {
            return self.clone();
        }
        let mut bits = self.to_bitmap_container();
        bits.lazy_union_with(other);
        Container::Bitmap(bits)
    }

    /// In-place lazy union, see [`Container::lazy_or`].
    ///
    /// Non-bitset accumulators are converted to a bitset first, except a full
    /// run container, which absorbs any union unchanged.
    pub fn lazy_ior(&mut self, other: &Container) {
        match self {
            Container::Bitmap(bits) => bits.lazy_union_with(other),
            Container::Run(runs) if runs.is_full() => (),
            _ => {
                let mut bits = self.to_bitmap_container();
                bits.lazy_union_with(other);
                *self = Container::Bitmap(bits);
            }
        }
    }

    /// Re-encodes this container in-place into the smallest representation
    /// for its current contents and returns the resulting kind.
    pub fn optimize(&mut self) -> ContainerKind {
        let cardinality = self.compute_cardinality();
        let optimal_kind = Self::infer_optimal_kind(cardinality, self.count_runs());
        if optimal_kind == self.kind() {
            return optimal_kind;
        }
        *self = match optimal_kind {
            ContainerKind::Array => Container::Array(self.to_array_container()),
            ContainerKind::Bitmap => Container::Bitmap(self.to_bitmap_container()),
            ContainerKind::Run => Container::Run(self.to_run_container()),
        };
        optimal_kind
    }

    /// Picks the smallest encoding for a container with the given number of
    /// values and runs.
    pub fn infer_optimal_kind(cardinality: usize, run_count: usize) -> ContainerKind {
        let run_bytes = 2 + 4 * run_count;
        let (kind, bytes) = if cardinality <= ARRAY_MAX_SIZE {
            (ContainerKind::Array, 2 * cardinality)
        } else {
            (ContainerKind::Bitmap, BitmapContainer::SIZE_BYTES)
        };
        if run_bytes < bytes {
            ContainerKind::Run
        } else {
            kind
        }
    }

    fn is_full_run(&self) -> bool {
        matches!(self, Container::Run(runs) if runs.is_full())
    }

    fn from_dense(mut bits: BitmapContainer) -> Container {
        if bits.compute_cardinality() <= ARRAY_MAX_SIZE {
            Container::Array(bits.to_array_container())
        } else {
            Container::Bitmap(bits)
        }
    }
}

/// Iterator over the values of a [`Container`], in ascending order.
pub enum ContainerIter<'a> {
    Array(std::iter::Copied<std::slice::Iter<'a, u16>>),
    Bitmap(BitmapIter<'a>),
    Run(RunIter<'a>),
}

impl Iterator for ContainerIter<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        match self {
            ContainerIter::Array(iter) => iter.next(),
            ContainerIter::Bitmap(iter) => iter.next(),
            ContainerIter::Run(iter) => iter.next(),
        }
    }
}
