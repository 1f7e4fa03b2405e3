//! Boundary traits for the execution-unit primitive.
//!
//! The pool never creates workers itself; it goes through a
//! [`WorkerSpawner`]. The built-in `runtime::ThreadSpawner` runs a
//! [`WorkerJob`] on a dedicated OS thread, but any implementation works as
//! long as its handles deliver exactly one terminal event and honor
//! termination requests.

use async_trait::async_trait;

use crate::core::error::{AppResult, PoolError};
use crate::core::worker::{WorkerHandle, WorkerOptions, WorkerTarget};

/// Creates workers on behalf of the pool.
///
/// `start` must be non-blocking: it kicks off execution and returns the
/// handle without waiting for the worker to do anything. The handle is
/// expected to eventually reach exactly one terminal state, including after
/// [`WorkerHandle::request_stop`].
pub trait WorkerSpawner: Send + Sync + Clone + 'static {
    /// Start a worker for `target` and return its handle.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::StartFailed`] when the underlying primitive
    /// cannot be created.
    fn start(&self, target: &WorkerTarget, options: WorkerOptions)
        -> Result<WorkerHandle, PoolError>;
}

/// Body executed by spawners that run workers in-process.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use worker_pool::core::{AppResult, WorkerJob, WorkerOptions, WorkerTarget};
///
/// #[derive(Clone)]
/// struct Render;
///
/// #[async_trait]
/// impl WorkerJob for Render {
///     async fn run(&self, target: WorkerTarget, options: WorkerOptions) -> AppResult<i32> {
///         render(&target.program, options.data).await?;
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait WorkerJob: Send + Sync + Clone + 'static {
    /// Run the worker body to completion, resolving to its exit code.
    ///
    /// An `Err` becomes [`crate::core::TerminalState::Errored`] with the
    /// error's message attached; the pool frees the slot either way.
    async fn run(&self, target: WorkerTarget, options: WorkerOptions) -> AppResult<i32>;
}
