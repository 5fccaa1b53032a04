//! Consensus cycle configuration

use crate::domain::{ConsensusError, ConsensusResult};
use pc_17_block_production::MiningConfig;
use serde::Deserialize;
use shared_types::ChainId;
use std::time::Duration;

/// Runtime configuration for the consensus cycle
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Chain the cycle produces blocks for
    pub chain_id: ChainId,

    /// Block assembly and mining settings
    pub mining: MiningConfig,

    /// Stop the loop on the first rejected transaction instead of skipping it
    pub halt_on_validation_error: bool,

    /// Process entries already in the mempool before waiting for new ones
    pub drain_backlog: bool,

    /// Upper bound for one nonce search in milliseconds (0 = unbounded)
    pub mining_timeout_ms: u64,

    /// Delay before re-reading the mempool after a missed mining deadline
    pub retry_backoff_ms: u64,

    /// Id recorded as the block validator
    pub validator_id: String,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            mining: MiningConfig::default(),
            halt_on_validation_error: false,
            drain_backlog: true,
            mining_timeout_ms: 0,
            retry_backoff_ms: 500,
            validator_id: "authority".to_string(),
        }
    }
}

impl ConsensusConfig {
    /// Reject settings the cycle cannot run with.
    pub fn validate(&self) -> ConsensusResult<()> {
        if self.chain_id == 0 {
            return Err(ConsensusError::InvalidConfig("chain id must be non-zero".into()));
        }
        if self.validator_id.is_empty() {
            return Err(ConsensusError::InvalidConfig("validator id must be set".into()));
        }
        self.mining.validate()?;
        Ok(())
    }

    /// Per-block mining deadline, if any.
    pub fn mining_timeout(&self) -> Option<Duration> {
        (self.mining_timeout_ms > 0).then(|| Duration::from_millis(self.mining_timeout_ms))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
