//! # cx-03-value-ledger
//!
//! The Bank: validates and executes signed transfers from one account to
//! one or more recipients.
//!
//! ## Validation Pipeline
//!
//! Fail-fast; nothing is written until every step passed.
//!
//! | Step | Check | Error kind |
//! |------|-------|------------|
//! | 1 | address belongs to the caller (current or previous) | Forbidden |
//! | 2 | Ed25519 signature over the raw details JSON | Unauthorized |
//! | 3 | details parse | BadRequest |
//! | 4 | `|now - timestamp| <= clock skew bound` | BadRequest |
//! | 5 | type, reason, amount, reason-specific fields | BadRequest |
//! | 6 | at least one recipient | BadRequest |
//! | 7 | balance covers amount (unless network initiated) | InsufficientFunds |
//! | - | every recipient resolves | NotFound |
//! | - | originator and recipients pairwise distinct | DuplicateParticipant |
//! | - | split adds up | BadRequest |
//!
//! ## Split Rules
//!
//! ```text
//! fraction  → amount × share
//! absolute  → share
//! remainder → (amount − Σ fraction − Σ absolute) / remainder count
//! ```
//!
//! Credits always sum to exactly `amount`; the last remainder recipient
//! absorbs decimal rounding dust.
//!
//! ## Commit
//!
//! Debit originator → record transaction → credit each recipient. Each
//! balance write is an atomic increment; the sequence as a whole is not
//! atomic. A failure mid-credit surfaces as `PartialCommit` and is logged
//! with the recipients already credited.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::identity::{address_for_key, binding_for_key, Ed25519IdentityVerifier};
pub use adapters::memory::{InMemoryAccountStore, InMemoryLedgerStore};
pub use domain::{
    BankTransaction, Credit, LedgerConfig, LedgerError, LedgerResult, Portion, Reason, Recipient,
    SplitPlan, TransactionDetails, TransactionResult, TransactionType,
};
pub use ports::inbound::BankApi;
pub use ports::outbound::{AccountStore, IdentityVerifier, LedgerStore};
pub use service::Bank;
