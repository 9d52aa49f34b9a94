//! Error types for the ledger.

use rust_decimal::Decimal;
use shared_types::{Address, ErrorKind, StoreError, UserId};
use thiserror::Error;

/// Ledger errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    /// The signing address is not one of the caller's addresses.
    #[error("Address {0} does not belong to the caller")]
    AddressNotOwned(Address),

    #[error("Signature does not match the transaction details")]
    InvalidSignature,

    #[error("Malformed transaction details: {0}")]
    MalformedDetails(String),

    #[error("Transaction timestamp {timestamp} is {skew_ms}ms away from server time")]
    StaleTimestamp { timestamp: u64, skew_ms: u64 },

    /// Missing or disallowed field.
    #[error("Invalid transaction details: {0}")]
    InvalidDetails(String),

    #[error("Recipients exceed the total: {allocated} allocated of {amount}")]
    RecipientsExceedAmount { allocated: Decimal, amount: Decimal },

    #[error("Amounts don't add up: {allocated} allocated of {amount}")]
    AmountsDoNotAddUp { allocated: Decimal, amount: Decimal },

    #[error("Insufficient funds: balance {balance}, amount {amount}")]
    InsufficientFunds { balance: Decimal, amount: Decimal },

    #[error("Account not found: {0}")]
    AccountNotFound(UserId),

    #[error("No account for recipient address {0}")]
    RecipientNotFound(Address),

    /// The transfer would push a balance past what the ledger can represent.
    #[error("Balance of {0} would leave the representable range")]
    BalanceOutOfRange(UserId),

    #[error("User {0} appears more than once in the transaction")]
    DuplicateParticipant(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The originator was debited but not every recipient was credited.
    #[error("Transaction {transaction_id} partially committed ({credited} credits applied): {source}")]
    PartialCommit {
        transaction_id: String,
        credited: usize,
        source: StoreError,
    },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AddressNotOwned(_) => ErrorKind::Forbidden,
            LedgerError::InvalidSignature => ErrorKind::Unauthorized,
            LedgerError::MalformedDetails(_)
            | LedgerError::StaleTimestamp { .. }
            | LedgerError::InvalidDetails(_)
            | LedgerError::RecipientsExceedAmount { .. }
            | LedgerError::AmountsDoNotAddUp { .. }
            | LedgerError::BalanceOutOfRange(_) => ErrorKind::BadRequest,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::AccountNotFound(_) | LedgerError::RecipientNotFound(_) => {
                ErrorKind::NotFound
            }
            LedgerError::DuplicateParticipant(_) => ErrorKind::DuplicateParticipant,
            LedgerError::Store(e) => e.kind(),
            LedgerError::PartialCommit { .. } => ErrorKind::StoreUnavailable,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        LedgerError::InvalidDetails(reason.into())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
