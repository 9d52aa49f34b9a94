//! Adapters implementing the outbound ports.

pub mod identity;
pub mod memory;

pub use identity::Ed25519IdentityVerifier;
pub use memory::{InMemoryAccountStore, InMemoryLedgerStore};
