//! Lock manager configuration.

use std::time::Duration;

/// Card lock configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockConfig {
    /// How long a holder may keep the lock before others may break it (ms).
    pub timeout_ms: u64,
    /// Sleep between acquisition attempts.
    pub retry_interval: Duration,
    /// Attempts before giving up with `LockTimeout`.
    pub max_attempts: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry_interval: Duration::from_millis(100),
            max_attempts: 300,
        }
    }
}

impl LockConfig {
    /// Fast-retry config for tests.
    pub fn for_testing() -> Self {
        Self {
            timeout_ms: 30_000,
            retry_interval: Duration::from_millis(1),
            max_attempts: 20,
        }
    }

    /// Rejects configurations under which `acquire` could never succeed.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("lock max_attempts must be at least 1".into());
        }
        if self.timeout_ms == 0 {
            return Err("lock timeout_ms must be positive".into());
        }
        Ok(())
    }
}
