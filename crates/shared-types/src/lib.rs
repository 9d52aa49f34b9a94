//! # Shared Types Crate
//!
//! This crate contains the domain entities every Cardex subsystem agrees on.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Cards, accounts and mutation records are
//!   defined once here and consumed by the lock manager (cx-01), the mutation
//!   engine (cx-02), the ledger (cx-03) and the event bus.
//! - **Compound Keys over Duck Typing**: per-user and shared card state are
//!   distinguished by [`Group`] plus a scope user, never by dynamic objects.
//! - **One Taxonomy**: every subsystem error maps onto [`ErrorKind`].

pub mod entities;
pub mod errors;
pub mod mutation;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use mutation::*;
pub use time::*;

/// Decimal type used for all coin amounts.
pub use rust_decimal::Decimal;
