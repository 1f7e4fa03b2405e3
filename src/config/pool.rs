//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Default stack size for worker threads (2 MiB).
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Smallest stack size accepted for worker threads.
const MIN_STACK_SIZE: usize = 64 * 1024;

/// Worker pool configuration.
///
/// `capacity` is the ceiling on simultaneously active workers and
/// `max_waiting` bounds the wait queue (`None` = unbounded). Both are
/// immutable once a pool is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Maximum simultaneously active workers.
    pub capacity: usize,
    /// Maximum queued requests; `None` for unbounded, `Some(0)` to reject
    /// instead of queue whenever the pool is at capacity.
    pub max_waiting: Option<usize>,
    /// Stack size in bytes for worker threads spawned by the thread runtime.
    pub thread_stack_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            max_waiting: None,
            thread_stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl WorkerPoolConfig {
    /// Configuration with the default single-worker capacity and an
    /// unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity ceiling.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Bound the wait queue.
    #[must_use]
    pub fn with_max_waiting(mut self, max_waiting: usize) -> Self {
        self.max_waiting = Some(max_waiting);
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        if self.thread_stack_size < MIN_STACK_SIZE {
            return Err(format!(
                "thread_stack_size must be at least {MIN_STACK_SIZE} bytes"
            ));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the environment, reading a `.env` file first
    /// if one is present.
    ///
    /// Recognized variables: `WORKER_POOL_CAPACITY`,
    /// `WORKER_POOL_MAX_WAITING`, `WORKER_POOL_STACK_SIZE`. Unset variables
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error description.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Ok(capacity) = std::env::var("WORKER_POOL_CAPACITY") {
            cfg.capacity = capacity
                .parse()
                .map_err(|e| format!("WORKER_POOL_CAPACITY: {e}"))?;
        }
        if let Ok(max_waiting) = std::env::var("WORKER_POOL_MAX_WAITING") {
            cfg.max_waiting = Some(
                max_waiting
                    .parse()
                    .map_err(|e| format!("WORKER_POOL_MAX_WAITING: {e}"))?,
            );
        }
        if let Ok(stack) = std::env::var("WORKER_POOL_STACK_SIZE") {
            cfg.thread_stack_size = stack
                .parse()
                .map_err(|e| format!("WORKER_POOL_STACK_SIZE: {e}"))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
