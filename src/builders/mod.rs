//! Builders to construct pools from configuration.

pub mod pool_builder;

pub use pool_builder::{build_pool, build_thread_pool};
