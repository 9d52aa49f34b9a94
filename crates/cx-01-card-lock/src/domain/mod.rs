//! Domain layer for the card lock: configuration, holder identity, errors.

pub mod config;
pub mod errors;
pub mod holder;

pub use config::LockConfig;
pub use errors::{LockError, LockResult};
pub use holder::LockHolder;
