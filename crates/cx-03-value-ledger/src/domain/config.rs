//! Ledger configuration.

/// Ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Maximum distance between a request's timestamp and server time (ms).
    pub clock_skew_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            clock_skew_ms: 15 * 60 * 1000,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.clock_skew_ms == 0 {
            return Err("clock_skew_ms must be positive".into());
        }
        Ok(())
    }
}
