//! # Error Types
//!
//! Defines the error taxonomy shared across subsystems and the store error
//! every outbound storage port reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure categories surfaced to the request layer.
///
/// Each subsystem error enum maps onto one of these via `kind()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Address/ownership mismatch.
    Forbidden,
    /// Bad signature.
    Unauthorized,
    /// Malformed or inconsistent payload.
    BadRequest,
    InsufficientFunds,
    /// Card, collection item or recipient missing.
    NotFound,
    DuplicateParticipant,
    InvalidMutation,
    /// Transient: the whole operation may be retried.
    LockTimeout,
    /// Transient infrastructure failure.
    StoreUnavailable,
}

impl ErrorKind {
    /// Response status the request layer should return.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Forbidden => 403,
            ErrorKind::Unauthorized => 401,
            ErrorKind::BadRequest => 400,
            ErrorKind::InsufficientFunds => 402,
            ErrorKind::NotFound => 404,
            ErrorKind::DuplicateParticipant => 409,
            ErrorKind::InvalidMutation => 422,
            ErrorKind::LockTimeout => 503,
            ErrorKind::StoreUnavailable => 503,
        }
    }

    /// Whether the caller may reasonably retry the whole operation.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::LockTimeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::InsufficientFunds => "insufficient-funds",
            ErrorKind::NotFound => "not-found",
            ErrorKind::DuplicateParticipant => "duplicate-participant",
            ErrorKind::InvalidMutation => "invalid-mutation",
            ErrorKind::LockTimeout => "lock-timeout",
            ErrorKind::StoreUnavailable => "store-unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by persistent store adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or the operation failed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A unique-key constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// The record addressed by the write does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A numeric update would leave the record outside its representable range.
    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

impl StoreError {
    /// Category a subsystem reports when this error reaches the caller unchanged.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Unavailable(_) | StoreError::Conflict(_) => ErrorKind::StoreUnavailable,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::OutOfRange(_) => ErrorKind::BadRequest,
        }
    }
}
