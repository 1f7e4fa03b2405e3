//! Runtime spawner implementations.

pub mod thread_spawner;

pub use thread_spawner::ThreadSpawner;
