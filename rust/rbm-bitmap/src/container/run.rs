//! Run-length container storing disjoint inclusive runs of values.

use itertools::Itertools;

use crate::container::{SPAN, array::ArrayContainer, bitmap::BitmapContainer};

/// An inclusive run of container values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Run {
    /// First value of the run.
    pub first: u16,
    /// Inclusive last value of the run.
    pub last: u16,
}

impl Run {
    #[inline]
    pub fn new(first: u16, last: u16) -> Run {
        debug_assert!(first <= last);
        Run { first, last }
    }

    #[inline]
    pub fn point(value: u16) -> Run {
        Run {
            first: value,
            last: value,
        }
    }

    /// The run covering the whole container.
    pub fn full() -> Run {
        Run {
            first: 0,
            last: u16::MAX,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.last as usize - self.first as usize + 1
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        value >= self.first && value <= self.last
    }

    pub fn is_adjacent_or_overlaps(&self, other: Run) -> bool {
        self.first as u32 <= other.last as u32 + 1 && other.first as u32 <= self.last as u32 + 1
    }

    /// Merges `next` into this run when they touch, otherwise hands both back.
    /// Shaped for `Itertools::coalesce`.
    pub fn coalesce(&self, next: Run) -> Result<Run, (Run, Run)> {
        if self.first <= next.first && self.is_adjacent_or_overlaps(next) {
            Ok(Run {
                first: self.first,
                last: self.last.max(next.last),
            })
        } else {
            Err((*self, next))
        }
    }
}

/// A container that stores its values as sorted, disjoint, non-adjacent runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunContainer {
    runs: Vec<Run>,
}

impl RunContainer {
    pub fn new(runs: Vec<Run>) -> RunContainer {
        let container = RunContainer { runs };
        #[cfg(debug_assertions)]
        container.check_invariants();
        container
    }

    pub fn full() -> RunContainer {
        RunContainer {
            runs: vec![Run::full()],
        }
    }

    /// Builds the minimal run list for sorted, unique values.
    pub fn from_values(values: &[u16]) -> RunContainer {
        let runs = values
            .iter()
            .map(|&value| Run::point(value))
            .coalesce(|prev, next| prev.coalesce(next))
            .collect();
        RunContainer { runs }
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn cardinality(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.runs.len() == 1 && self.runs[0] == Run::full()
    }

    pub fn contains(&self, value: u16) -> bool {
        let idx = self.runs.partition_point(|run| run.last < value);
        self.runs.get(idx).is_some_and(|run| run.contains(value))
    }

    /// Two-pointer intersection of the run lists.
    pub fn intersect(&self, other: &RunContainer) -> RunContainer {
        let mut out = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.runs.len() && j < other.runs.len() {
            let a = self.runs[i];
            let b = other.runs[j];
            let first = a.first.max(b.first);
            let last = a.last.min(b.last);
            if first <= last {
                out.push(Run { first, last });
            }
            if a.last < b.last {
                i += 1;
            } else {
                j += 1;
            }
        }
        RunContainer { runs: out }
    }

    pub fn iter(&self) -> RunIter<'_> {
        RunIter {
            runs: self.runs.iter(),
            current: None,
        }
    }

    pub fn to_array_container(&self) -> ArrayContainer {
        let mut values = Vec::with_capacity(self.cardinality());
        values.extend(self.iter());
        ArrayContainer::new(values)
    }

    pub fn to_bitmap_container(&self) -> BitmapContainer {
        BitmapContainer::from_runs(&self.runs)
    }

    pub fn check_invariants(&self) {
        assert!(self.cardinality() <= SPAN);
        assert!(self.runs.iter().all(|run| run.first <= run.last));
        assert!(
            self.runs
                .windows(2)
                .all(|pair| (pair[0].last as u32) + 1 < pair[1].first as u32)
        );
    }
}

/// Iterator over the values of a [`RunContainer`], in ascending order.
#[derive(Clone)]
pub struct RunIter<'a> {
    runs: std::slice::Iter<'a, Run>,
    current: Option<std::ops::RangeInclusive<u16>>,
}

impl Iterator for RunIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        loop {
            if let Some(value) = self.current.as_mut().and_then(Iterator::next) {
                return Some(value);
            }
            let run = self.runs.next()?;
            self.current = Some(run.first..=run.last);
        }
    }
}
