//! # Worker Pool
//!
//! A bounded concurrency controller for isolated execution units.
//!
//! Workers are expensive: each one owns an OS-level execution context
//! (a dedicated thread on the built-in runtime). This library caps how many
//! may run at once and gives callers a uniform, always-asynchronous
//! acquisition interface whether their request is served immediately or has
//! to wait for a slot.
//!
//! ## Core behavior
//!
//! - **Admission control**: `acquire` starts a worker immediately while the
//!   pool is below its capacity ceiling.
//! - **FIFO wait queue**: at capacity, requests queue in strict call order;
//!   an optional bound rejects overflow with [`core::PoolError::QueueFull`].
//! - **Recycling**: when a worker reaches its terminal state the freed slot
//!   goes to the head of the queue, never to a later caller.
//! - **Teardown**: `destroy` terminates every active worker and completes
//!   once all of them have stopped.
//!
//! ## Example
//!
//! ```rust,ignore
//! use worker_pool::builders::build_thread_pool;
//! use worker_pool::config::WorkerPoolConfig;
//! use worker_pool::core::{WorkerOptions, WorkerTarget};
//!
//! let pool = build_thread_pool(
//!     WorkerPoolConfig::new().with_capacity(4).with_max_waiting(64),
//!     my_job, // implements WorkerJob
//! )?;
//!
//! let worker = pool.acquire(WorkerTarget::new("resize"), WorkerOptions::default()).await?;
//! let state = worker.wait_terminal().await;
//!
//! pool.destroy().await;
//! ```
//!
//! The execution-unit primitive itself sits behind the
//! [`core::WorkerSpawner`] trait; `runtime::ThreadSpawner` is the built-in
//! implementation running each worker on its own OS thread.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core pool state machine and collaborator traits.
pub mod core;
/// Configuration models for pools.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Runtime spawner implementations.
pub mod runtime;
/// Shared utilities.
pub mod util;
