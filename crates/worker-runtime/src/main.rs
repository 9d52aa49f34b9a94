//! # Cardex Worker
//!
//! Entry point for one worker process. Workers are stateless apart from
//! their stores; any number may run side by side, coordinating card writes
//! through the advisory card lock.
//!
//! ## Startup Sequence
//!
//! 1. Install the tracing subscriber (`RUST_LOG`, default `info`)
//! 2. Load configuration from `CX_*` environment variables
//! 3. Validate it and build the platform container
//! 4. Start the fan-out logger
//! 5. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use worker_runtime::{PlatformConfig, WorkerRuntime};

/// Load configuration from the environment.
fn load_config() -> Result<PlatformConfig> {
    let config = PlatformConfig::from_env().context("Failed to read CX_* environment")?;
    info!(server_id = %config.server_id, "Configuration loaded");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = load_config()?;
    let mut runtime = WorkerRuntime::new(config).context("Invalid worker configuration")?;
    runtime.start();

    info!("Worker is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    runtime.shutdown().await;
    Ok(())
}
