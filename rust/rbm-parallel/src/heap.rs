//! K-way merge of bitmap registries by container key.
//!
//! [`KeyMergeHeap`] walks N bitmaps in lockstep and groups, for each distinct
//! key, the containers of every bitmap that holds that key. Each heap entry is
//! a cursor `(key, bitmap, position)` into a read-only input registry; the
//! cursors with the smallest key are advanced in place (replace-root) or
//! removed once their bitmap is exhausted.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, binary_heap::PeekMut},
    sync::Arc,
};

use rbm_bitmap::{Bitmap, Container};

/// All containers stored under one key, in input order.
#[derive(Debug, Clone)]
pub struct KeyBatch {
    pub key: u16,
    pub containers: Vec<Arc<Container>>,
}

impl KeyBatch {
    #[inline]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

/// Min-heap over the current key of every non-exhausted input bitmap.
///
/// Popping is `O(k log N)` for a batch of `k` containers, so a full merge of
/// `T` containers costs `O(T log N)`.
pub struct KeyMergeHeap<'a> {
    bitmaps: &'a [Bitmap],
    heap: BinaryHeap<Cursor>,
}

impl<'a> KeyMergeHeap<'a> {
    /// Creates a heap positioned on the first container of every input.
    /// Empty bitmaps contribute no entry.
    pub fn new(bitmaps: &'a [Bitmap]) -> KeyMergeHeap<'a> {
        let heap = bitmaps
            .iter()
            .enumerate()
            .filter(|(_, bitmap)| !bitmap.is_empty())
            .map(|(bitmap, registry)| Cursor {
                key: registry.key_at(0),
                bitmap,
                position: 0,
            })
            .collect();
        KeyMergeHeap { bitmaps, heap }
    }

    /// Number of inputs that still have containers left.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Smallest key not yet returned.
    pub fn peek_key(&self) -> Option<u16> {
        self.heap.peek().map(|cursor| cursor.key)
    }

    /// Removes and returns the batch for the smallest remaining key.
    ///
    /// Every cursor on that key moves to the next container of its bitmap, or
    /// leaves the heap when the bitmap is exhausted.
    pub fn pop_next_containers(&mut self) -> Option<KeyBatch> {
        let key = self.heap.peek()?.key;
        let mut containers = Vec::with_capacity(self.heap.len());
        while let Some(mut top) = self.heap.peek_mut() {
            if top.key != key {
                break;
            }
            let bitmap = &self.bitmaps[top.bitmap];
            containers.push(bitmap.shared_container_at(top.position));

            let next = top.position + 1;
            if next < bitmap.container_count() {
                // Sifts down when `top` is dropped.
                top.position = next;
                top.key = bitmap.key_at(next);
            } else {
                PeekMut::pop(top);
            }
        }
        Some(KeyBatch { key, containers })
    }
}

impl Iterator for KeyMergeHeap<'_> {
    type Item = KeyBatch;

    fn next(&mut self) -> Option<KeyBatch> {
        self.pop_next_containers()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    key: u16,
    bitmap: usize,
    position: usize,
}

// `BinaryHeap` is a max-heap: reverse the key order. Ties go to the lower
// bitmap index so batches list containers in input order.
impl Ord for Cursor {
    fn cmp(&self, other: &Cursor) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.bitmap.cmp(&self.bitmap))
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Cursor) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
