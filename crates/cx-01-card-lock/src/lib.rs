//! # cx-01-card-lock
//!
//! Advisory, timeout-bounded exclusive lock per card, plus the card
//! lifecycle (post, soft-delete) that owns the lock field.
//!
//! ## Overview
//!
//! Every card mutation runs under this lock. The lock lives on the card
//! record itself and is taken with a compare-and-swap against the exact
//! `(holder, acquired_at)` pair the caller last observed, so two workers
//! sharing one store can never both believe they hold it.
//!
//! ```text
//!            acquire(card, timeout, holder)
//!                        │
//!          ┌─────────────▼──────────────┐
//!          │ read card                  │◄──────────────┐
//!          └─────────────┬──────────────┘               │
//!       unlocked / expired / same holder?               │ sleep(retry_interval)
//!          yes │                   no │                 │ attempts < max
//!   CAS(observed lock → new lock)     └─────────────────┤
//!     won │        lost │                               │
//!   Ok(card)           └────────────────────────────────┘
//!                                    attempts exhausted → LockTimeout
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | At most one holder at a time | CAS on the observed lock value |
//! | Expired locks are breakable | `now - acquired_at > timeout` |
//! | Same holder re-enters | holder ids are unique per operation |
//! | Release always clears | `release` ignores the current holder |
//!
//! ## Example
//!
//! ```rust,ignore
//! use cx_01_card_lock::{CardLockManager, LockConfig, LockHolder};
//! use cx_01_card_lock::ports::inbound::CardLockApi;
//!
//! let holder = LockHolder::for_operation("worker-1");
//! let card = locks.acquire(&card_id, 30_000, &holder).await?;
//! // ... mutate under the lock ...
//! locks.release(&card).await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod lifecycle;
pub mod ports;
pub mod service;

pub use adapters::memory::InMemoryCardStore;
pub use domain::{LockConfig, LockError, LockHolder, LockResult};
pub use lifecycle::CardDirectory;
pub use ports::inbound::{CardDirectoryApi, CardLockApi};
pub use ports::outbound::CardStore;
pub use service::CardLockManager;
