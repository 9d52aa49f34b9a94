//! # Platform Container
//!
//! Configuration plus the container that builds every service from it.

pub mod config;
pub mod platform;

pub use config::{BusConfig, ConfigError, PlatformConfig};
pub use platform::{
    ConcreteBank, ConcreteCardDirectory, ConcreteLockManager, ConcreteMutationEngine, Platform,
};
