//! Error types for the mutation engine.

use cx_01_card_lock::LockError;
use shared_types::{CardId, ErrorKind, StoreError};
use thiserror::Error;

/// Mutation engine errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MutationError {
    /// Unknown or deleted card.
    #[error("Card not found: {0}")]
    CardNotFound(CardId),

    /// Referenced collection item does not exist.
    #[error("Record {key} not found in collection {collection}")]
    RecordNotFound { collection: String, key: String },

    /// Malformed payload, unknown type, or an operation the state rejects.
    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    /// Lock acquisition failed.
    #[error(transparent)]
    Lock(LockError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LockError> for MutationError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::CardNotFound(card_id) => MutationError::CardNotFound(card_id),
            LockError::Store(store) => MutationError::Store(store),
            other => MutationError::Lock(other),
        }
    }
}

impl MutationError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        MutationError::InvalidMutation(reason.into())
    }

    pub fn record_not_found(collection: &str, key: &str) -> Self {
        MutationError::RecordNotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::CardNotFound(_) | MutationError::RecordNotFound { .. } => {
                ErrorKind::NotFound
            }
            MutationError::InvalidMutation(_) => ErrorKind::InvalidMutation,
            MutationError::Lock(lock) => lock.kind(),
            MutationError::Store(e) => e.kind(),
        }
    }
}

/// Result type for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;
