//! # PoA-Chain Node Runtime
//!
//! The main entry point for a single-authority PoA-Chain node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults + `POA_*` environment)
//! 2. Validate: keystore password set, difficulty in range
//! 3. Unseal (or generate) the authority key
//! 4. Create genesis block (if not exists)
//! 5. Spawn the consensus cycle
//! 6. Wait for Ctrl+C, then stop the cycle and log metrics

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn load_config() -> Result<NodeConfig> {
    let config = NodeConfig::from_env().context("Failed to read POA_* environment")?;
    config.validate().context("Invalid node configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;
    info!(config = ?config, "Configuration loaded");

    let runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    let snapshot = runtime.shutdown().await?;
    info!(
        metrics = %serde_json::to_string(&snapshot).context("Failed to encode metrics")?,
        "Final cycle metrics"
    );

    Ok(())
}
