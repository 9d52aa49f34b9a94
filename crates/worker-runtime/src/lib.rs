//! # Worker Runtime Library
//!
//! Exposes the worker's wiring for tests and embedding. The binary entry
//! point is `main.rs`.
//!
//! - `container/` - configuration and the platform container
//! - `fanout` - event bus logger task
//! - `runtime` - startup and graceful shutdown

pub mod container;
pub mod fanout;
pub mod runtime;

pub use container::{ConfigError, Platform, PlatformConfig};
pub use runtime::WorkerRuntime;
