//! Pool lifecycle state machine: admission, wait queue, recycling, teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::error::PoolError;
use crate::core::spawner::WorkerSpawner;
use crate::core::worker::{TerminalState, WorkerHandle, WorkerId, WorkerOptions, WorkerTarget};

/// Statistics snapshot for a pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Capacity ceiling.
    pub capacity: usize,
    /// Wait queue bound, if any.
    pub max_waiting: Option<usize>,
    /// Currently active workers.
    pub active: usize,
    /// Requests currently waiting for a slot.
    pub waiting: usize,
    /// Total acquisition requests.
    pub submitted: u64,
    /// Workers started, immediately or by promotion.
    pub started: u64,
    /// Workers that exited cleanly.
    pub completed: u64,
    /// Workers that terminated with an error.
    pub failed: u64,
    /// Requests rejected because the wait queue was at its bound.
    pub rejected: u64,
}

/// Internal counters (thread-safe).
#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

type AcquireReply = oneshot::Sender<Result<WorkerHandle, PoolError>>;

/// A queued acquisition request. Consumed exactly once on promotion.
struct PendingRequest {
    target: WorkerTarget,
    options: WorkerOptions,
    reply: AcquireReply,
    /// Span current at enqueue time; the promoted start runs inside it.
    span: tracing::Span,
}

struct PoolShared<S: WorkerSpawner> {
    config: WorkerPoolConfig,
    spawner: S,
    /// Active worker set. Admission, recycling, and teardown each take this
    /// lock for their whole decision, wait-queue operations included, so a
    /// freed slot can never be stolen ahead of a waiting request.
    active: Mutex<HashMap<WorkerId, WorkerHandle>>,
    wait_tx: Sender<PendingRequest>,
    wait_rx: Receiver<PendingRequest>,
    counters: PoolCounters,
}

/// Bounded pool of isolated workers with a FIFO wait queue.
///
/// `acquire` starts a worker immediately while below the capacity ceiling,
/// queues the request at capacity, and rejects it when the queue is at its
/// bound. Completed workers hand their slot to the queue head. Cloning
/// returns another handle to the same pool.
pub struct WorkerPool<S: WorkerSpawner> {
    shared: Arc<PoolShared<S>>,
}

impl<S: WorkerSpawner> Clone for WorkerPool<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: WorkerSpawner> WorkerPool<S> {
    /// Create a pool from validated configuration and a spawner.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] when the configuration fails
    /// validation (for example a zero capacity).
    pub fn new(config: WorkerPoolConfig, spawner: S) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (wait_tx, wait_rx) = match config.max_waiting {
            Some(bound) => crossbeam_channel::bounded(bound),
            None => crossbeam_channel::unbounded(),
        };

        info!(
            capacity = config.capacity,
            max_waiting = ?config.max_waiting,
            "worker pool initialized"
        );

        Ok(Self {
            shared: Arc::new(PoolShared {
                config,
                spawner,
                active: Mutex::new(HashMap::new()),
                wait_tx,
                wait_rx,
                counters: PoolCounters::default(),
            }),
        })
    }

    /// Number of currently active workers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.active.lock().len()
    }

    /// Number of requests currently waiting for a slot.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.shared.wait_rx.len()
    }

    /// Snapshot of pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    /// Acquire a worker for `target`.
    ///
    /// Resolves with the handle once a worker has started for this request,
    /// which may be immediately (below capacity) or after queued requests
    /// ahead of it have been served. Requests are served in strict call
    /// order. No outcome, rejection included, is observable synchronously
    /// within the call: the future passes a scheduling point first.
    ///
    /// The span current at the time of the call is restored around a later
    /// promotion, so deferred starts trace to their origin rather than to
    /// whichever completion freed the slot.
    ///
    /// # Errors
    ///
    /// - [`PoolError::QueueFull`] — at capacity with the queue at its bound;
    ///   the request was not enqueued.
    /// - [`PoolError::StartFailed`] — the spawner could not start a worker.
    /// - [`PoolError::ShuttingDown`] — the request was queued and the pool
    ///   was destroyed (or dropped) before a slot freed up.
    pub async fn acquire(
        &self,
        target: WorkerTarget,
        options: WorkerOptions,
    ) -> Result<WorkerHandle, PoolError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.shared.admit(target, options, reply_tx);
        tokio::task::yield_now().await;
        reply_rx.await.unwrap_or(Err(PoolError::ShuttingDown))
    }

    /// Terminate every active worker and wait until all have stopped.
    ///
    /// Termination requests are issued to the whole active snapshot before
    /// any acknowledgement is awaited. Requests still in the wait queue are
    /// rejected with [`PoolError::ShuttingDown`]. Later `acquire` calls are
    /// not refused, but workers started after destroy are the caller's to
    /// clean up.
    ///
    /// A worker that never honors its termination request blocks this call
    /// indefinitely; wrap in `tokio::time::timeout` when that bound matters.
    pub async fn destroy(&self) {
        let (snapshot, drained) = {
            let active = self.shared.active.lock();
            let snapshot: Vec<WorkerHandle> = active.values().cloned().collect();
            let mut drained = Vec::new();
            while let Ok(request) = self.shared.wait_rx.try_recv() {
                drained.push(request);
            }
            (snapshot, drained)
        };

        info!(
            active = snapshot.len(),
            rejected = drained.len(),
            "destroying worker pool"
        );

        for request in drained {
            let _ = request.reply.send(Err(PoolError::ShuttingDown));
        }
        for handle in &snapshot {
            handle.request_stop();
        }
        for handle in snapshot {
            handle.wait_terminal().await;
        }
    }
}

impl<S: WorkerSpawner> PoolShared<S> {
    fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.config.capacity,
            max_waiting: self.config.max_waiting,
            active: self.active.lock().len(),
            waiting: self.wait_rx.len(),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            started: self.counters.started.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// Admission decision: start now, enqueue, or reject.
    fn admit(self: &Arc<Self>, target: WorkerTarget, options: WorkerOptions, reply: AcquireReply) {
        enum Decision {
            Started(WorkerHandle, AcquireReply),
            Rejected(PoolError, AcquireReply),
            Queued,
        }

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let decision = {
            let mut active = self.active.lock();
            if active.len() < self.config.capacity {
                match self.spawner.start(&target, options) {
                    Ok(handle) => {
                        active.insert(handle.id(), handle.clone());
                        Decision::Started(handle, reply)
                    }
                    Err(err) => Decision::Rejected(err, reply),
                }
            } else {
                let request = PendingRequest {
                    target,
                    options,
                    reply,
                    span: tracing::Span::current(),
                };
                match self.wait_tx.try_send(request) {
                    Ok(()) => Decision::Queued,
                    Err(TrySendError::Full(request)) => {
                        Decision::Rejected(PoolError::QueueFull, request.reply)
                    }
                    Err(TrySendError::Disconnected(request)) => {
                        Decision::Rejected(PoolError::ShuttingDown, request.reply)
                    }
                }
            }
        };

        match decision {
            Decision::Started(handle, reply) => {
                self.counters.started.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = %handle.id(), program = handle.program(), "worker started");
                self.watch(&handle);
                let _ = reply.send(Ok(handle));
            }
            Decision::Rejected(err, reply) => {
                if matches!(err, PoolError::QueueFull) {
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(waiting = self.wait_rx.len(), "acquisition rejected: wait queue full");
                }
                let _ = reply.send(Err(err));
            }
            Decision::Queued => {
                debug!(waiting = self.wait_rx.len(), "request queued waiting for a free slot");
            }
        }
    }

    /// Attach the pool's completion observer to a started worker.
    ///
    /// The handle fires observers once, so recycling runs exactly once per
    /// worker no matter how its terminal signals raced.
    fn watch(self: &Arc<Self>, handle: &WorkerHandle) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let id = handle.id();
        handle.on_terminal(move |state| {
            if let Some(shared) = weak.upgrade() {
                shared.recycle(id, &state);
            }
        });
    }

    /// Free the slot held by `finished`, then promote waiting requests while
    /// a slot is free. Removal and promotion share one critical section.
    fn recycle(self: &Arc<Self>, finished: WorkerId, state: &TerminalState) {
        match state {
            TerminalState::Exited(code) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = %finished, code = *code, "worker exited");
            }
            TerminalState::Errored(message) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = %finished, error = %message, "worker errored");
            }
        }

        let mut promoted: Vec<(WorkerHandle, AcquireReply)> = Vec::new();
        let mut failed: Vec<(PoolError, AcquireReply)> = Vec::new();
        {
            let mut active = self.active.lock();
            if active.remove(&finished).is_none() {
                return;
            }
            while active.len() < self.config.capacity {
                let Ok(request) = self.wait_rx.try_recv() else {
                    break;
                };
                // Promotion bypasses admission checks: the request already
                // waited its turn and the slot is known free. The start runs
                // in the span captured at enqueue time, not in the span of
                // the completion that freed the slot.
                let started = request
                    .span
                    .in_scope(|| self.spawner.start(&request.target, request.options));
                match started {
                    Ok(handle) => {
                        active.insert(handle.id(), handle.clone());
                        promoted.push((handle, request.reply));
                    }
                    Err(err) => failed.push((err, request.reply)),
                }
            }
        }

        for (err, reply) in failed {
            let _ = reply.send(Err(err));
        }
        for (handle, reply) in promoted {
            self.counters.started.fetch_add(1, Ordering::Relaxed);
            debug!(worker_id = %handle.id(), program = handle.program(), "queued request promoted");
            self.watch(&handle);
            let _ = reply.send(Ok(handle));
        }
    }
}
