//! # Worker Runtime
//!
//! Owns the platform container and the background tasks around it.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Build the platform container
//! 3. Start the fan-out logger
//! 4. Serve until shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::{ConfigError, Platform, PlatformConfig};
use crate::fanout::spawn_fanout_logger;

/// How long shutdown waits for background tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A running worker.
pub struct WorkerRuntime {
    platform: Arc<Platform>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    fanout: Option<JoinHandle<u64>>,
}

impl WorkerRuntime {
    /// Validates `config` and builds every service.
    pub fn new(config: PlatformConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_platform(Platform::new(config)))
    }

    /// Wraps an already-built container.
    pub fn from_platform(platform: Platform) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            platform: Arc::new(platform),
            shutdown_tx,
            shutdown_rx,
            fanout: None,
        }
    }

    /// Starts background tasks. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if self.fanout.is_some() {
            return;
        }

        cx_01_card_lock::service::log_lock_config(&self.platform.config.lock);
        self.fanout = Some(spawn_fanout_logger(
            &self.platform.event_bus,
            self.shutdown_rx.clone(),
        ));

        let config = &self.platform.config;
        info!(
            server_id = %config.server_id,
            sync_page_limit = config.mutation.sync_page_limit,
            clock_skew_ms = config.ledger.clock_skew_ms,
            bus_capacity = config.bus.channel_capacity,
            "Cardex worker started"
        );
    }

    /// Signals background tasks to stop and waits for them.
    ///
    /// Returns the number of events the fan-out logger recorded.
    pub async fn shutdown(&mut self) -> u64 {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let Some(handle) = self.fanout.take() else {
            return 0;
        };
        let seen = match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
            Ok(Ok(seen)) => seen,
            Ok(Err(e)) => {
                error!(error = %e, "Fan-out logger task failed");
                0
            }
            Err(_) => {
                warn!("Fan-out logger did not stop in time");
                0
            }
        };

        let bus = self.platform.event_bus.stats();
        info!(
            events = seen,
            cards = bus.cards,
            mutations = bus.mutations,
            ledger = bus.ledger,
            undelivered = bus.undelivered,
            "Shutdown complete"
        );
        seen
    }

    /// The services this worker exposes.
    pub fn platform(&self) -> Arc<Platform> {
        Arc::clone(&self.platform)
    }
}
