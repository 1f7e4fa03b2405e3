//! Worker handles and terminal-event plumbing.
//!
//! A [`WorkerHandle`] represents one isolated execution unit. The pool keeps
//! a tracking clone while the worker is active; the caller owns its own
//! clone and may attach terminal observers without disturbing the pool's
//! bookkeeping. A worker delivers exactly one terminal event, enforced here
//! rather than trusted to spawner implementations.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use uuid::Uuid;

/// Unique identifier for a worker.
pub type WorkerId = Uuid;

/// Exit code reported when a worker stops in response to a termination
/// request rather than on its own.
pub const TERMINATED_EXIT_CODE: i32 = 1;

/// Descriptor of the program a worker executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTarget {
    /// Program identifier handed to the spawner (path, registered job name).
    pub program: String,
}

impl WorkerTarget {
    /// Create a target from a program identifier.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl From<&str> for WorkerTarget {
    fn from(program: &str) -> Self {
        Self::new(program)
    }
}

impl From<String> for WorkerTarget {
    fn from(program: String) -> Self {
        Self::new(program)
    }
}

/// Start options for a worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerOptions {
    /// Opaque payload made available to the worker body.
    pub data: Option<serde_json::Value>,
    /// Optional name used for thread naming and logs.
    pub name: Option<String>,
}

impl WorkerOptions {
    /// Options carrying only a payload.
    #[must_use]
    pub fn with_data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            name: None,
        }
    }
}

/// Reason a worker reached its terminal state.
///
/// Both variants free the worker's slot identically; the distinction is only
/// meaningful to whoever observes the handle directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalState {
    /// The worker finished with an exit code.
    Exited(i32),
    /// The worker failed with an error message.
    Errored(String),
}

/// Observable lifecycle state of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    /// Spawned but not yet executing.
    Starting,
    /// Executing.
    Running,
    /// Reached its terminal state. No further transitions occur.
    Terminated(TerminalState),
}

type TerminalObserver = Box<dyn FnOnce(TerminalState) + Send>;

/// Terminal state once set, plus the observers still waiting for it.
struct TerminalCell {
    state: Option<TerminalState>,
    observers: Vec<TerminalObserver>,
}

/// Cooperative stop signal shared between a handle and its worker body.
struct CancelSignal {
    requested: AtomicBool,
    notify: Notify,
}

struct HandleInner {
    id: WorkerId,
    program: String,
    running: AtomicBool,
    cell: Mutex<TerminalCell>,
    cancel: CancelSignal,
}

/// Handle to one running execution unit.
///
/// Cloning is cheap and shares the same worker. Observers registered with
/// [`WorkerHandle::on_terminal`] each fire exactly once; registration after
/// the terminal event fires the observer immediately.
#[derive(Clone)]
pub struct WorkerHandle {
    inner: Arc<HandleInner>,
}

impl WorkerHandle {
    /// Create a handle for a worker about to start.
    ///
    /// Intended for [`crate::core::WorkerSpawner`] implementations: call
    /// [`Self::mark_running`] once execution begins, observe
    /// [`Self::cancelled`] for termination requests, and deliver the outcome
    /// with [`Self::notify_terminal`].
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: Uuid::new_v4(),
                program: program.into(),
                running: AtomicBool::new(false),
                cell: Mutex::new(TerminalCell {
                    state: None,
                    observers: Vec::new(),
                }),
                cancel: CancelSignal {
                    requested: AtomicBool::new(false),
                    notify: Notify::new(),
                },
            }),
        }
    }

    /// Unique id of this worker.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.inner.id
    }

    /// Program this worker was started for.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.inner.program
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> WorkerStatus {
        if let Some(state) = self.inner.cell.lock().state.clone() {
            return WorkerStatus::Terminated(state);
        }
        if self.inner.running.load(Ordering::Acquire) {
            WorkerStatus::Running
        } else {
            WorkerStatus::Starting
        }
    }

    /// Mark the worker as executing.
    pub fn mark_running(&self) {
        self.inner.running.store(true, Ordering::Release);
    }

    /// Deliver the terminal state and fire pending observers.
    ///
    /// Only the first delivery wins; returns `false` if a terminal state was
    /// already set, so racing exit-like and error-like signals collapse to
    /// exactly one event.
    pub fn notify_terminal(&self, state: TerminalState) -> bool {
        let observers = {
            let mut cell = self.inner.cell.lock();
            if cell.state.is_some() {
                return false;
            }
            cell.state = Some(state.clone());
            std::mem::take(&mut cell.observers)
        };
        for observer in observers {
            observer(state.clone());
        }
        true
    }

    /// Register an observer for the terminal event.
    ///
    /// The observer fires exactly once, immediately if the worker is already
    /// terminal.
    pub fn on_terminal(&self, observer: impl FnOnce(TerminalState) + Send + 'static) {
        let mut cell = self.inner.cell.lock();
        if let Some(state) = cell.state.clone() {
            drop(cell);
            observer(state);
            return;
        }
        cell.observers.push(Box::new(observer));
    }

    /// Wait for the terminal event.
    pub async fn wait_terminal(&self) -> TerminalState {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.on_terminal(move |state| {
            let _ = tx.send(state);
        });
        rx.await
            .unwrap_or_else(|_| TerminalState::Errored("terminal notification dropped".into()))
    }

    /// Request the worker stop without waiting for the acknowledgement.
    ///
    /// Idempotent; the worker body observes the request via
    /// [`Self::cancelled`].
    pub fn request_stop(&self) {
        if !self.inner.cancel.requested.swap(true, Ordering::AcqRel) {
            tracing::debug!(worker_id = %self.inner.id, "termination requested");
        }
        self.inner.cancel.notify.notify_waiters();
    }

    /// True once a stop has been requested.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.inner.cancel.requested.load(Ordering::Acquire)
    }

    /// Resolves once a stop has been requested.
    ///
    /// Worker bodies race this against their own work; resolves immediately
    /// when the request already happened.
    pub async fn cancelled(&self) {
        let cancel = &self.inner.cancel;
        loop {
            if cancel.requested.load(Ordering::Acquire) {
                return;
            }
            let notified = cancel.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if cancel.requested.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    /// Request the worker stop and wait for its terminal state.
    pub async fn terminate(&self) -> TerminalState {
        self.request_stop();
        self.wait_terminal().await
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.inner.id)
            .field("program", &self.inner.program)
            .field("status", &self.status())
            .finish()
    }
}
