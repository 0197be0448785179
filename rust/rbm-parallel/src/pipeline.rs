//! Parallel k-way union and intersection.
//!
//! One invocation runs three roles inside a `std::thread::scope`:
//! - the calling thread drives the [`KeyMergeHeap`], assigns every surviving
//!   key the next assembly index and dispatches its batch;
//! - `worker_count` workers pull multi-container batches from a bounded
//!   work queue and combine them;
//! - one assembler thread collects indexed results from an unbounded queue
//!   and hands the finished bitmap back through a oneshot channel.
//!
//! Batches that need no combination (a single container) skip the workers and
//! go straight to the assembler, aliasing the input container. Once the heap
//! is exhausted the caller sends the expected result count and waits.

use std::{sync::Arc, thread};

use log::{debug, trace};
use rbm_bitmap::{Bitmap, Container};
use rbm_workflow::{
    mpmc::{self, Receiver, Sender},
    oneshot,
};

use crate::{
    assembler::{AssemblerMessage, IndexedResult, ResultAssembler},
    combine::{intersect_containers, union_containers},
    config::ParConfig,
    heap::{KeyBatch, KeyMergeHeap},
};

/// Union of all `bitmaps`.
///
/// The union of no bitmaps is empty. Containers present in exactly one input
/// are shared with that input and flagged copy-on-write in the result.
pub fn par_or(bitmaps: &[Bitmap], config: &ParConfig) -> Bitmap {
    if bitmaps.is_empty() {
        return Bitmap::new();
    }
    run_pipeline(bitmaps, config, SetOp::Union)
}

/// Intersection of all `bitmaps`.
///
/// The intersection of no bitmaps is empty, as is any intersection with an
/// empty input.
pub fn par_and(bitmaps: &[Bitmap], config: &ParConfig) -> Bitmap {
    if bitmaps.is_empty() || bitmaps.iter().any(Bitmap::is_empty) {
        return Bitmap::new();
    }
    run_pipeline(bitmaps, config, SetOp::Intersection)
}

/// [`par_or`] with [`ParConfig::default`].
pub fn par_or_default(bitmaps: &[Bitmap]) -> Bitmap {
    par_or(bitmaps, &ParConfig::default())
}

/// [`par_and`] with [`ParConfig::default`].
pub fn par_and_default(bitmaps: &[Bitmap]) -> Bitmap {
    par_and(bitmaps, &ParConfig::default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOp {
    Union,
    Intersection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    /// Drop the key without consuming an assembly index.
    Skip,
    /// Forward the single container to the assembler unchanged.
    PassThrough,
    /// Send the batch to a worker.
    Combine,
}

impl SetOp {
    pub(crate) fn route(self, batch_len: usize, input_count: usize) -> Route {
        match self {
            SetOp::Union if batch_len == 1 => Route::PassThrough,
            SetOp::Union => Route::Combine,
            SetOp::Intersection if batch_len != input_count => Route::Skip,
            SetOp::Intersection if batch_len == 1 => Route::PassThrough,
            SetOp::Intersection => Route::Combine,
        }
    }

    fn combine(self, containers: &[Arc<Container>]) -> Container {
        match self {
            SetOp::Union => union_containers(containers),
            SetOp::Intersection => intersect_containers(containers),
        }
    }
}

struct WorkItem {
    index: usize,
    batch: KeyBatch,
}

pub(crate) fn run_pipeline(bitmaps: &[Bitmap], config: &ParConfig, op: SetOp) -> Bitmap {
    let worker_count = config.worker_count().max(1);
    let prefix = config.thread_name_prefix();
    debug!(
        "{op:?} of {} bitmaps: {worker_count} workers, work queue capacity {}",
        bitmaps.len(),
        config.work_queue_capacity().max(1)
    );

    let (work_tx, work_rx) = mpmc::bounded::<WorkItem>(config.work_queue_capacity().max(1));
    let (result_tx, result_rx) = mpmc::unbounded::<AssemblerMessage>();
    let (done_tx, done_rx) = oneshot::channel::<Bitmap>();

    thread::scope(|scope| {
        thread::Builder::new()
            .name(format!("{prefix}-assembler"))
            .spawn_scoped(scope, move || {
                let bitmap = ResultAssembler::new().run(result_rx);
                // The caller only goes away by unwinding.
                done_tx.send(bitmap).ok();
            })
            .expect("failed to spawn assembler thread");

        for worker_id in 0..worker_count {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            thread::Builder::new()
                .name(format!("{prefix}-worker-{worker_id}"))
                .spawn_scoped(scope, move || run_worker(worker_id, op, work_rx, result_tx))
                .expect("failed to spawn worker thread");
        }
        drop(work_rx);

        let (dispatched, combined) = dispatch(bitmaps, op, &work_tx, &result_tx);
        drop(work_tx);
        result_tx
            .send(AssemblerMessage::ExpectedCount(dispatched))
            .expect("result assembler stopped early");
        drop(result_tx);

        let bitmap = done_rx.recv().expect("result assembler panicked");
        debug!(
            "{op:?} done: {dispatched} keys dispatched ({combined} combined by workers), {} containers in output",
            bitmap.container_count()
        );
        bitmap
    })
}

/// Walks the heap and routes every batch. Returns the number of assembly
/// indices handed out and how many of them went to workers.
fn dispatch(
    bitmaps: &[Bitmap],
    op: SetOp,
    work: &Sender<WorkItem>,
    results: &Sender<AssemblerMessage>,
) -> (usize, usize) {
    let mut next_index = 0;
    let mut combined = 0;
    for mut batch in KeyMergeHeap::new(bitmaps) {
        let index = next_index;
        match op.route(batch.len(), bitmaps.len()) {
            Route::Skip => continue,
            Route::PassThrough => {
                let container = batch
                    .containers
                    .pop()
                    .expect("key batch holds at least one container");
                let result = IndexedResult {
                    key: batch.key,
                    container,
                    index,
                    shared: true,
                };
                results
                    .send(AssemblerMessage::Result(result))
                    .expect("result assembler stopped early");
            }
            Route::Combine => {
                work.send(WorkItem { index, batch })
                    .expect("all workers stopped early");
                combined += 1;
            }
        }
        next_index += 1;
    }
    (next_index, combined)
}

fn run_worker(
    worker_id: usize,
    op: SetOp,
    work: Receiver<WorkItem>,
    results: Sender<AssemblerMessage>,
) {
    trace!("worker {worker_id} started");
    let mut processed = 0usize;
    for WorkItem { index, batch } in work.iter() {
        let container = op.combine(&batch.containers);
        let result = IndexedResult {
            key: batch.key,
            container: Arc::new(container),
            index,
            shared: false,
        };
        results
            .send(AssemblerMessage::Result(result))
            .expect("result assembler stopped early");
        processed += 1;
    }
    trace!("worker {worker_id} exiting after {processed} batches");
}
