//! Tuning knobs for the parallel pipelines.

use rbm_common::{Result, error::Error, verify_arg};

/// Environment variable overriding [`ParConfig::worker_count`].
pub const WORKER_COUNT_ENV: &str = "RBM_WORKER_COUNT";

/// Environment variable overriding [`ParConfig::work_queue_capacity`].
pub const WORK_QUEUE_CAPACITY_ENV: &str = "RBM_WORK_QUEUE_CAPACITY";

/// Configuration of one `par_or` / `par_and` invocation.
///
/// Threads and queues are created per invocation; nothing outlives the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParConfig {
    worker_count: usize,
    work_queue_capacity: usize,
    thread_name_prefix: String,
}

impl ParConfig {
    pub const DEFAULT_WORK_QUEUE_CAPACITY: usize = 128;

    pub const DEFAULT_THREAD_NAME_PREFIX: &'static str = "rbm-par";

    /// Default configuration with overrides from `RBM_WORKER_COUNT` and
    /// `RBM_WORK_QUEUE_CAPACITY` when they are set.
    pub fn from_env() -> Result<ParConfig> {
        let mut config = ParConfig::default();
        if let Some(count) = read_env(WORKER_COUNT_ENV)? {
            config.worker_count = count;
        }
        if let Some(capacity) = read_env(WORK_QUEUE_CAPACITY_ENV)? {
            config.work_queue_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> ParConfig {
        self.worker_count = worker_count;
        self
    }

    pub fn with_work_queue_capacity(mut self, capacity: usize) -> ParConfig {
        self.work_queue_capacity = capacity;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> ParConfig {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Number of worker threads combining batches. The pipelines treat 0 as 1.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Capacity of the bounded work queue. The pipelines treat 0 as 1.
    pub fn work_queue_capacity(&self) -> usize {
        self.work_queue_capacity
    }

    pub fn thread_name_prefix(&self) -> &str {
        &self.thread_name_prefix
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(worker_count, self.worker_count > 0);
        verify_arg!(work_queue_capacity, self.work_queue_capacity > 0);
        Ok(())
    }
}

impl Default for ParConfig {
    fn default() -> ParConfig {
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        ParConfig {
            worker_count,
            work_queue_capacity: Self::DEFAULT_WORK_QUEUE_CAPACITY,
            thread_name_prefix: Self::DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

fn read_env(key: &str) -> Result<Option<usize>> {
    let Ok(value) = std::env::var(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|e| Error::invalid_arg(key, format!("{value:?}: {e}")))
}
