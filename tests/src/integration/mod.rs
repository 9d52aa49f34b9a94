//! Cross-crate integration tests.

pub mod concurrency;
pub mod fixtures;
pub mod flows;
