//! Error types for pool operations.

use thiserror::Error;

/// Errors produced by the worker pool.
///
/// All variants are delivered through the `acquire` future, never panicked
/// across the asynchronous boundary. Worker runtime failures are not pool
/// errors; they surface as [`crate::core::TerminalState::Errored`] on the
/// handle.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool is at capacity and the wait queue is at its configured
    /// bound. Recoverable: retry later or apply backpressure upstream.
    #[error("wait queue full")]
    QueueFull,
    /// The spawner failed to start a worker. Not retried by the pool.
    #[error("worker failed to start: {0}")]
    StartFailed(String),
    /// The request was rejected because the pool is being torn down, or the
    /// pool was dropped while the request waited.
    #[error("pool is shutting down")]
    ShuttingDown,
    /// Configuration validation failed at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Job-facing result using anyhow for worker bodies.
pub type AppResult<T> = Result<T, anyhow::Error>;
