//! Ports (hexagonal boundaries) for the ledger.

pub mod inbound;
pub mod outbound;

pub use inbound::BankApi;
pub use outbound::{AccountStore, IdentityVerifier, LedgerStore};
