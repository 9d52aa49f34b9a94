//! # Worker Configuration
//!
//! Composes the per-subsystem configs and applies `CX_*` environment
//! overrides on top of their defaults.

use cx_01_card_lock::LockConfig;
use cx_02_card_mutation::MutationConfig;
use cx_03_value_ledger::LedgerConfig;
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Complete worker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Identity of this worker process; prefixes every lock holder id.
    pub server_id: String,
    /// Card lock manager configuration.
    pub lock: LockConfig,
    /// Mutation engine configuration.
    pub mutation: MutationConfig,
    /// Ledger configuration.
    pub ledger: LedgerConfig,
    /// Notification fan-out configuration.
    pub bus: BusConfig,
}

/// Notification fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Events buffered per subscriber before it lags.
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::with_server_id(format!("worker-{}", Uuid::new_v4()))
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("{var}={value:?} is not a valid value")]
    InvalidEnv { var: &'static str, value: String },

    /// The composed configuration cannot work.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl PlatformConfig {
    /// Defaults for every subsystem under a fixed worker id.
    pub fn with_server_id(server_id: impl Into<String>) -> Self {
        let server_id = server_id.into();
        let lock = LockConfig::default();
        Self {
            mutation: MutationConfig {
                server_id: server_id.clone(),
                lock_timeout_ms: lock.timeout_ms,
                ..MutationConfig::default()
            },
            server_id,
            lock,
            ledger: LedgerConfig::default(),
            bus: BusConfig::default(),
        }
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `CX_*`
    /// variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("CX_SERVER_ID") {
            Some(id) => Self::with_server_id(id),
            None => Self::default(),
        };

        if let Some(ms) = parse_var(&lookup, "CX_LOCK_TIMEOUT_MS")? {
            config.lock.timeout_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "CX_LOCK_RETRY_INTERVAL_MS")? {
            config.lock.retry_interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var(&lookup, "CX_LOCK_MAX_ATTEMPTS")? {
            config.lock.max_attempts = attempts;
        }
        if let Some(ms) = parse_var(&lookup, "CX_CLOCK_SKEW_MS")? {
            config.ledger.clock_skew_ms = ms;
        }
        if let Some(limit) = parse_var(&lookup, "CX_SYNC_PAGE_LIMIT")? {
            config.mutation.sync_page_limit = limit;
        }
        if let Some(capacity) = parse_var(&lookup, "CX_BUS_CAPACITY")? {
            config.bus.channel_capacity = capacity;
        }

        config.mutation.lock_timeout_ms = config.lock.timeout_ms;
        Ok(config)
    }

    /// Rejects configurations the subsystems cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lock.validate().map_err(ConfigError::Invalid)?;
        self.mutation.validate().map_err(ConfigError::Invalid)?;
        self.ledger.validate().map_err(ConfigError::Invalid)?;
        if self.mutation.server_id != self.server_id {
            return Err(ConfigError::Invalid(
                "mutation.server_id must match server_id".into(),
            ));
        }
        if self.mutation.lock_timeout_ms != self.lock.timeout_ms {
            return Err(ConfigError::Invalid(
                "mutation.lock_timeout_ms must match lock.timeout_ms".into(),
            ));
        }
        if self.bus.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "bus channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}
