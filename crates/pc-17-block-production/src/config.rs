//! Configuration types for block production

use crate::error::{BlockProductionError, Result};
use serde::Deserialize;
use shared_types::TransactionKind;

/// Highest difficulty a keccak-256 hex digest can express.
pub const MAX_DIFFICULTY: u16 = 64;

/// Where the nonce search starts.
#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NonceStart {
    /// Start at 0 (reproducible)
    #[default]
    Zero,
    /// Start at a random value
    Random,
}

/// Runtime configuration for block assembly and mining
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Leading zero hex digits required in the block hash
    pub difficulty: u16,

    /// Reward recorded in every header
    pub mining_reward: u64,

    /// Nonce search start
    pub start_nonce: NonceStart,

    /// Gas price recorded on block transactions
    pub gas_price: u64,

    /// Gas units recorded for coin transfers
    pub coin_gas_units: u64,

    /// Gas units recorded for token mints and transfers
    pub token_gas_units: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            mining_reward: 700,
            start_nonce: NonceStart::Zero,
            gas_price: 1,
            coin_gas_units: 21_000,
            token_gas_units: 50_000,
        }
    }
}

impl MiningConfig {
    /// Reject settings the miner cannot satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(BlockProductionError::InvalidConfig(format!(
                "difficulty {} exceeds {}",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        Ok(())
    }

    /// Gas units recorded for a transaction kind.
    pub fn gas_units(&self, kind: TransactionKind) -> u64 {
        match kind {
            TransactionKind::Coin => self.coin_gas_units,
            TransactionKind::Token => self.token_gas_units,
        }
    }
}
