//! Mutation engine configuration.

/// Mutation engine configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationConfig {
    /// Identity of this worker; prefix of every lock holder id.
    pub server_id: String,
    /// Lock staleness bound passed to the lock manager (ms).
    pub lock_timeout_ms: u64,
    /// Upper bound on records returned by one sync query.
    pub sync_page_limit: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            server_id: "worker-local".to_string(),
            lock_timeout_ms: 30_000,
            sync_page_limit: 500,
        }
    }
}

impl MutationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server_id.is_empty() {
            return Err("server_id must not be empty".into());
        }
        if self.server_id.contains('/') {
            return Err("server_id must not contain '/'".into());
        }
        if self.sync_page_limit == 0 {
            return Err("sync_page_limit must be at least 1".into());
        }
        Ok(())
    }
}
