//! Dense container storing one bit per value.

use std::ops::RangeInclusive;

use itertools::Itertools;

use crate::container::{
    Container, SPAN,
    array::ArrayContainer,
    run::{Run, RunContainer},
};

/// A container backed by a fixed 65536-bit bitset (1024 `u64` words, LSB first).
///
/// The cardinality is cached. Lazy unions leave it as `None` (unknown), and
/// [`BitmapContainer::compute_cardinality`] restores it with a popcount.
#[derive(Clone)]
pub struct BitmapContainer {
    words: Box<[u64]>,
    cardinality: Option<usize>,
}

impl BitmapContainer {
    pub const WORD_COUNT: usize = SPAN / 64;

    pub const SIZE_BYTES: usize = SPAN / 8;

    pub fn empty() -> BitmapContainer {
        BitmapContainer {
            words: vec![0u64; Self::WORD_COUNT].into_boxed_slice(),
            cardinality: Some(0),
        }
    }

    pub fn full() -> BitmapContainer {
        BitmapContainer {
            words: vec![u64::MAX; Self::WORD_COUNT].into_boxed_slice(),
            cardinality: Some(SPAN),
        }
    }

    pub fn from_values(values: &[u16]) -> BitmapContainer {
        let mut bits = BitmapContainer::empty();
        for &value in values {
            bits.words[value as usize >> 6] |= 1u64 << (value & 63);
        }
        bits.cardinality = None;
        bits.compute_cardinality();
        bits
    }

    pub fn from_runs(runs: &[Run]) -> BitmapContainer {
        let mut bits = BitmapContainer::empty();
        for run in runs {
            bits.set_run(run.first..=run.last);
        }
        bits.cardinality = None;
        bits.compute_cardinality();
        bits
    }

    /// Cached cardinality, `None` after a lazy union.
    #[inline]
    pub fn known_cardinality(&self) -> Option<usize> {
        self.cardinality
    }

    /// Number of set bits. Falls back to a popcount (without caching) when the
    /// cached value is unknown.
    pub fn cardinality(&self) -> usize {
        self.cardinality.unwrap_or_else(|| self.count_ones())
    }

    /// Recounts the set bits and caches the result.
    pub fn compute_cardinality(&mut self) -> usize {
        let cardinality = self.count_ones();
        self.cardinality = Some(cardinality);
        cardinality
    }

    pub fn is_empty(&self) -> bool {
        match self.cardinality {
            Some(cardinality) => cardinality == 0,
            None => self.words.iter().all(|&word| word == 0),
        }
    }

    pub fn is_full(&self) -> bool {
        match self.cardinality {
            Some(cardinality) => cardinality == SPAN,
            None => self.words.iter().all(|&word| word == u64::MAX),
        }
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        (self.words[value as usize >> 6] >> (value & 63)) & 1 != 0
    }

    /// Sets every bit in the inclusive range. Invalidates the cached cardinality.
    pub fn set_run(&mut self, range: RangeInclusive<u16>) {
        let start = *range.start() as usize;
        let end = *range.end() as usize + 1;
        if start >= end {
            return;
        }
        self.cardinality = None;

        let (start_word, start_bit) = (start >> 6, start & 63);
        let (end_word, end_bit) = (end >> 6, end & 63);

        if start_word == end_word {
            let mask = ((1u64 << end_bit) - 1) & !((1u64 << start_bit) - 1);
            self.words[start_word] |= mask;
            return;
        }

        self.words[start_word] |= !((1u64 << start_bit) - 1);
        for word in &mut self.words[start_word + 1..end_word] {
            *word = u64::MAX;
        }
        if end_bit > 0 {
            self.words[end_word] |= (1u64 << end_bit) - 1;
        }
    }

    /// Exact word-wise intersection.
    pub fn intersect(&self, other: &BitmapContainer) -> BitmapContainer {
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(&a, &b)| a & b)
            .collect::<Box<[u64]>>();
        let mut bits = BitmapContainer {
            words,
            cardinality: None,
        };
        bits.compute_cardinality();
        bits
    }

    /// In-place exact intersection.
    pub fn intersect_with(&mut self, other: &BitmapContainer) {
        for (word, &other_word) in self.words.iter_mut().zip(other.words.iter()) {
            *word &= other_word;
        }
        self.compute_cardinality();
    }

    /// ORs `other` into this bitset without maintaining the cardinality.
    pub fn lazy_union_with(&mut self, other: &Container) {
        match other {
            Container::Array(array) => {
                for &value in array.values() {
                    self.words[value as usize >> 6] |= 1u64 << (value & 63);
                }
            }
            Container::Bitmap(bits) => {
                for (word, &other_word) in self.words.iter_mut().zip(bits.words.iter()) {
                    *word |= other_word;
                }
            }
            Container::Run(runs) => {
                for run in runs.runs() {
                    self.set_run(run.first..=run.last);
                }
            }
        }
        self.cardinality = None;
    }

    pub fn count_runs(&self) -> usize {
        // A run starts at bit `i` if bit `i` is set and bit `i - 1` is not,
        // carrying the previous word's MSB into bit 0.
        let mut runs = 0usize;
        let mut prev_word = 0u64;
        for &word in self.words.iter() {
            let shifted_prev = (word << 1) | (prev_word >> 63);
            runs += (word & !shifted_prev).count_ones() as usize;
            prev_word = word;
        }
        runs
    }

    pub fn iter(&self) -> BitmapIter<'_> {
        BitmapIter {
            words: self.words.iter(),
            current_word: 0,
            next_word_index: 0,
            base_index: 0,
        }
    }

    pub fn to_array_container(&self) -> ArrayContainer {
        let mut values = Vec::with_capacity(self.cardinality());
        values.extend(self.iter());
        ArrayContainer::new(values)
    }

    pub fn to_run_container(&self) -> RunContainer {
        let runs = self
            .iter()
            .map(Run::point)
            .coalesce(|prev, next| prev.coalesce(next))
            .collect();
        RunContainer::new(runs)
    }

    fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }
}

impl std::fmt::Debug for BitmapContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitmapContainer")
            .field("cardinality", &self.cardinality)
            .field("runs", &self.count_runs())
            .finish()
    }
}

/// Iterator over the set bits of a [`BitmapContainer`], in ascending order.
#[derive(Clone)]
pub struct BitmapIter<'a> {
    words: std::slice::Iter<'a, u64>,
    current_word: u64,
    next_word_index: usize,
    base_index: usize,
}

impl Iterator for BitmapIter<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        loop {
            if self.current_word != 0 {
                let bit_offset = self.current_word.trailing_zeros() as usize;
                // Clear the least significant set bit.
                self.current_word &= self.current_word - 1;
                return Some((self.base_index + bit_offset) as u16);
            }
            let &word = self.words.next()?;
            self.current_word = word;
            self.base_index = self.next_word_index * 64;
            self.next_word_index += 1;
        }
    }
}
