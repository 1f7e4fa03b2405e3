//! Configuration models for pools.

pub mod pool;

pub use pool::WorkerPoolConfig;
