//! Error types for the card lock manager.

use shared_types::{CardId, ErrorKind, StoreError};
use thiserror::Error;

/// Card lock errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The card does not exist (or was deleted, for lifecycle operations).
    #[error("Card not found: {0}")]
    CardNotFound(CardId),

    /// Retry attempts exhausted while another holder kept the lock.
    #[error("Timed out acquiring lock on card {card_id} after {attempts} attempts")]
    Timeout { card_id: CardId, attempts: u32 },

    /// Only the creator may delete a card.
    #[error("User {user} may not delete card {card_id}")]
    NotCreator { card_id: CardId, user: String },

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockError::CardNotFound(_) => ErrorKind::NotFound,
            LockError::Timeout { .. } => ErrorKind::LockTimeout,
            LockError::NotCreator { .. } => ErrorKind::Forbidden,
            LockError::Store(e) => e.kind(),
        }
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
