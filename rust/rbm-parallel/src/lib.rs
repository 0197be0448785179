//! Parallel k-way set operations over keyed compressed bitmaps.
//!
//! The inputs are merged by key with a [`KeyMergeHeap`]. Every key yields a
//! batch of containers that is combined independently:
//! - [`par_or`] and [`par_and`] fan the batches out to a pool of scoped worker
//!   threads and reassemble the results in key order;
//! - [`horizontal_or`] is the single-threaded reference for unions.
//!
//! Unions are computed with lazy container unions followed by a single repair
//! step per key (see [`repair`]).

pub mod assembler;
pub mod combine;
pub mod config;
pub mod heap;
pub mod horizontal;
pub mod pipeline;
pub mod repair;


pub use config::ParConfig;
pub use heap::{KeyBatch, KeyMergeHeap};
pub use horizontal::horizontal_or;
pub use pipeline::{par_and, par_and_default, par_or, par_or_default};
