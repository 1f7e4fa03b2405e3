//! Builders to construct worker pools from configuration.

use crate::config::WorkerPoolConfig;
use crate::core::{PoolError, WorkerJob, WorkerPool, WorkerSpawner};
use crate::runtime::ThreadSpawner;

/// Build a pool backed by an arbitrary spawner.
///
/// # Errors
///
/// Returns [`PoolError::InvalidConfig`] when the configuration fails
/// validation.
pub fn build_pool<S: WorkerSpawner>(
    cfg: WorkerPoolConfig,
    spawner: S,
) -> Result<WorkerPool<S>, PoolError> {
    WorkerPool::new(cfg, spawner)
}

/// Build a pool whose workers run `job` on dedicated OS threads, sized per
/// the configuration's stack setting.
///
/// # Errors
///
/// Returns [`PoolError::InvalidConfig`] when the configuration fails
/// validation.
pub fn build_thread_pool<J: WorkerJob>(
    cfg: WorkerPoolConfig,
    job: J,
) -> Result<WorkerPool<ThreadSpawner<J>>, PoolError> {
    let spawner = ThreadSpawner::new(job).with_stack_size(cfg.thread_stack_size);
    WorkerPool::new(cfg, spawner)
}
