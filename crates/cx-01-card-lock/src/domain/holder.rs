//! Lock holder identity.

use std::fmt;
use uuid::Uuid;

/// Identifies one logical operation holding a card lock.
///
/// Rendered as `"{server_id}/{operation}"`. Two concurrent operations on the
/// same worker get different holders and therefore exclude each other; a
/// nested call that reuses its holder re-enters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockHolder {
    server_id: String,
    operation: String,
}

impl LockHolder {
    /// Fresh holder for a new operation on `server_id`.
    pub fn for_operation(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            operation: Uuid::new_v4().to_string(),
        }
    }

    pub fn new(server_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            operation: operation.into(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The value stored in `CardLock::holder`.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LockHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.server_id, self.operation)
    }
}
