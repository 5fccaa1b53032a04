//! # Node Runtime
//!
//! Owns the container and the consensus task.

use crate::container::{NodeConfig, SubsystemContainer};
use crate::genesis::initialize_genesis;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use pc_08_consensus::{ConsensusResult, MetricsSnapshot};
use shared_types::{cancellation, BlockchainState, CancelHandle, Cancellation};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The main node runtime.
pub struct NodeRuntime {
    /// Wired components.
    container: Arc<SubsystemContainer>,
    /// Stops the consensus loop.
    shutdown: CancelHandle,
    /// Observed by the consensus loop.
    token: Cancellation,
    /// Running consensus loop, if started.
    cycle_task: Mutex<Option<JoinHandle<ConsensusResult<()>>>>,
}

impl NodeRuntime {
    /// Create a runtime from a configuration that passed `validate`.
    pub fn new(config: NodeConfig) -> Result<Self> {
        info!("Creating PoA-Chain node runtime");
        let container = Arc::new(SubsystemContainer::new(config)?);
        let (shutdown, token) = cancellation();

        Ok(Self {
            container,
            shutdown,
            token,
            cycle_task: Mutex::new(None),
        })
    }

    /// Wired components.
    pub fn container(&self) -> &Arc<SubsystemContainer> {
        &self.container
    }

    /// Start the node runtime.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Initialize genesis block (if not exists)
    /// 2. Spawn the consensus cycle
    pub async fn start(&self) -> Result<BlockchainState> {
        info!("===========================================");
        info!("  PoA-Chain Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let head = initialize_genesis(&self.container).await?;

        let cycle = self.container.cycle.clone();
        let token = self.token.clone();
        let handle = tokio::spawn(async move { cycle.run(token).await });
        *self.cycle_task.lock() = Some(handle);

        info!(
            chain_id = self.container.ctx.chain_id,
            difficulty = self.container.config.consensus.mining.difficulty,
            keystore = %self.container.config.keystore.dir.display(),
            "Consensus cycle running"
        );
        Ok(head)
    }

    /// Stop the consensus loop and wait for it.
    ///
    /// A block already being committed finishes or aborts atomically.
    pub async fn shutdown(&self) -> Result<MetricsSnapshot> {
        info!("Initiating graceful shutdown...");
        self.shutdown.cancel();

        let handle = self.cycle_task.lock().take();
        if let Some(handle) = handle {
            match handle.await.context("Consensus task panicked")? {
                Ok(()) => info!("Consensus cycle stopped"),
                Err(e) => {
                    error!(error = %e, "Consensus cycle ended with error");
                    return Err(e).context("Consensus cycle failed");
                }
            }
        }

        let snapshot = self.container.cycle.metrics().snapshot();
        info!(
            blocks_committed = snapshot.blocks_committed,
            validation_rejections = snapshot.validation_rejections,
            commit_failures = snapshot.commit_failures,
            "Shutdown complete"
        );
        Ok(snapshot)
    }

    /// Whether the consensus task has exited on its own.
    pub fn is_cycle_finished(&self) -> bool {
        self.cycle_task
            .lock()
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }
}
