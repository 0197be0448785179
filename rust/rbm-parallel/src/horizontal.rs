//! Single-threaded k-way union.

use std::sync::Arc;

use rbm_bitmap::Bitmap;

use crate::{combine::union_containers, heap::KeyMergeHeap};

/// Union of all `bitmaps` on the calling thread.
///
/// Produces the same result as [`par_or`](crate::par_or): keys held by a single
/// input share that input's container (flagged copy-on-write), every other key
/// gets a freshly combined and repaired container.
pub fn horizontal_or(bitmaps: &[Bitmap]) -> Bitmap {
    let mut output = Bitmap::new();
    for mut batch in KeyMergeHeap::new(bitmaps) {
        if batch.len() == 1 {
            if let Some(container) = batch.containers.pop() {
                output.append_container(batch.key, container, true);
            }
        } else {
            let container = union_containers(&batch.containers);
            output.append_container(batch.key, Arc::new(container), false);
        }
    }
    output
}
