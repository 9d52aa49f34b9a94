//! # Cardex Test Suite
//!
//! Cross-crate flows that no single subsystem crate can exercise alone.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs     # Shared worker/account setup
//!     ├── flows.rs        # Post → mutate → sync, paid card opens, fan-out
//!     └── concurrency.rs  # Multi-worker lock exclusion, ledger conservation
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cx-tests
//! cargo test -p cx-tests integration::concurrency::
//! ```

#![allow(dead_code)]

pub mod integration;
