//! Communication primitives for the per-invocation worker pipelines.
//!
//! - [`mpmc`] - Blocking multi-producer, multi-consumer queues, bounded or
//!   unbounded. A bounded queue feeds combination work to a pool of workers;
//!   an unbounded one carries their results to a single consumer.
//! - [`oneshot`] - Single-value completion channel used to hand a finished
//!   result back to the thread that started the pipeline.

pub mod mpmc;
pub mod oneshot;
