//! Thread-backed worker spawner.
//!
//! Each worker runs on a dedicated OS thread with its own single-threaded
//! tokio runtime, so worker bodies never block the caller's async runtime.
//! The body is raced against the handle's cancellation signal; a termination
//! request resolves the worker as `Exited(TERMINATED_EXIT_CODE)`.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::{debug, error};

use crate::core::error::PoolError;
use crate::core::spawner::{WorkerJob, WorkerSpawner};
use crate::core::worker::{
    TerminalState, WorkerHandle, WorkerOptions, WorkerTarget, TERMINATED_EXIT_CODE,
};

/// Default worker thread stack size (2 MiB).
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Spawner that runs each worker on a dedicated OS thread.
#[derive(Clone)]
pub struct ThreadSpawner<J: WorkerJob> {
    job: J,
    stack_size: usize,
}

impl<J: WorkerJob> ThreadSpawner<J> {
    /// Create a spawner running `job` as the worker body.
    pub fn new(job: J) -> Self {
        Self {
            job,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Override the worker thread stack size.
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }
}

impl<J: WorkerJob> WorkerSpawner for ThreadSpawner<J> {
    fn start(
        &self,
        target: &WorkerTarget,
        options: WorkerOptions,
    ) -> Result<WorkerHandle, PoolError> {
        let handle = WorkerHandle::new(&target.program);
        let thread_name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("pool-worker-{}", &handle.id().to_string()[..8]));

        let worker = handle.clone();
        let job = self.job.clone();
        let target = target.clone();

        thread::Builder::new()
            .name(thread_name)
            .stack_size(self.stack_size)
            .spawn(move || run_worker(&worker, &job, target, options))
            .map_err(|e| PoolError::StartFailed(e.to_string()))?;

        Ok(handle)
    }
}

/// Worker thread body: build the runtime, race the job against the
/// cancellation signal, and always deliver exactly one terminal state --
/// panics included.
fn run_worker<J: WorkerJob>(
    worker: &WorkerHandle,
    job: &J,
    target: WorkerTarget,
    options: WorkerOptions,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(worker_id = %worker.id(), error = %e, "failed to build worker runtime");
            worker.notify_terminal(TerminalState::Errored(format!(
                "failed to build worker runtime: {e}"
            )));
            return;
        }
    };

    worker.mark_running();
    debug!(worker_id = %worker.id(), program = target.program.as_str(), "worker running");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(async {
            tokio::select! {
                () = worker.cancelled() => TerminalState::Exited(TERMINATED_EXIT_CODE),
                result = job.run(target, options) => match result {
                    Ok(code) => TerminalState::Exited(code),
                    Err(e) => TerminalState::Errored(e.to_string()),
                },
            }
        })
    }));

    let state = outcome.unwrap_or_else(|payload| TerminalState::Errored(panic_message(&payload)));
    debug!(worker_id = %worker.id(), state = ?state, "worker finished");
    worker.notify_terminal(state);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {message}")
    } else {
        "worker panicked".into()
    }
}
