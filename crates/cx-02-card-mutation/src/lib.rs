//! # cx-02-card-mutation
//!
//! Applies structured mutations to a card's collaborative state and keeps
//! the replayable mutation log that clients sync from.
//!
//! ## Overview
//!
//! A card has two state namespaces:
//! - **shared**: one copy, scope user is empty
//! - **user**: one private overlay per acting user
//!
//! Each namespace holds scalar *properties* and ordered *collections*.
//! Collection order is a fractional index, so inserting or moving an item
//! never renumbers its siblings (until f64 precision runs out, at which
//! point the partition is renumbered once).
//!
//! ## Commit Path
//!
//! ```text
//! apply_mutation(card, user, payload)
//!   │
//!   ├── acquire card lock (cx-01) ──── NotFound / LockTimeout
//!   ├── apply payload to properties / collections
//!   ├── at    = max(now, last_in_scope.at + 1)
//!   ├── index = fetch_and_add(global counter)
//!   ├── persist MutationRecord
//!   ├── release card lock (always)
//!   └── publish MutationCommitted (best-effort, outside the lock)
//! ```
//!
//! ## Ordering Guarantees
//!
//! | Property | Scope |
//! |----------|-------|
//! | `index` strictly increasing | global, across all cards |
//! | `at` strictly increasing | per `(card, group, scope user)` |
//! | item `index` unique | per `(card, group, scope user, collection)` |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod apply;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::memory::InMemoryCardStateStore;
pub use domain::{
    CardProperty, CardStateSnapshot, CollectionEntry, CollectionItem, CollectionKey, GroupState,
    MutationConfig, MutationError, MutationResult, PropertyKey,
};
pub use ports::inbound::CardMutationApi;
pub use ports::outbound::CardStateStore;
pub use service::CardMutationEngine;
