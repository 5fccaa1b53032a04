//! # Difficulty Miner
//!
//! Hashcash-style nonce search: increment `header.nonce` until the header
//! hash starts with `difficulty` zero hex digits.
//!
//! Mining is the only unbounded step of the cycle, so the cancellation
//! token is checked on every iteration.

use crate::config::{MiningConfig, NonceStart, MAX_DIFFICULTY};
use crate::error::{BlockProductionError, Result};
use shared_types::{BlockHeader, Cancellation, Hash};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Result of a successful nonce search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningOutcome {
    /// Winning nonce (already written into the header)
    pub nonce: u64,
    /// Header hash at that nonce
    pub hash: Hash,
    /// Nonces tried
    pub attempts: u64,
    /// Wall time spent
    pub elapsed: Duration,
}

/// Whether `hash` begins with `difficulty` zero hex digits.
pub fn meets_difficulty(hash: &Hash, difficulty: u16) -> bool {
    let digits = usize::from(difficulty);
    if digits > usize::from(MAX_DIFFICULTY) {
        return false;
    }
    let full_bytes = digits / 2;
    if hash[..full_bytes].iter().any(|b| *b != 0) {
        return false;
    }
    // Odd digit count: the high nibble of the next byte must be zero too.
    digits % 2 == 0 || hash[full_bytes] >> 4 == 0
}

/// Brute-force nonce search over block headers.
#[derive(Debug, Clone)]
pub struct DifficultyMiner {
    start: NonceStart,
}

impl DifficultyMiner {
    /// Miner using the configured start strategy.
    pub fn new(config: &MiningConfig) -> Self {
        Self {
            start: config.start_nonce,
        }
    }

    fn start_nonce(&self) -> u64 {
        match self.start {
            NonceStart::Zero => 0,
            NonceStart::Random => rand::random(),
        }
    }

    /// Search for a nonce satisfying `header.difficulty`, writing it into
    /// `header`. Blocks the calling thread.
    pub fn mine(&self, header: &mut BlockHeader, cancel: &Cancellation) -> Result<MiningOutcome> {
        if header.difficulty > MAX_DIFFICULTY {
            return Err(BlockProductionError::InvalidConfig(format!(
                "difficulty {} exceeds {}",
                header.difficulty, MAX_DIFFICULTY
            )));
        }

        let started = Instant::now();
        let first = self.start_nonce();
        header.nonce = first;
        let mut attempts: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(BlockProductionError::MiningCancelled { attempts });
            }

            let hash = header.hash()?;
            attempts += 1;
            if meets_difficulty(&hash, header.difficulty) {
                return Ok(MiningOutcome {
                    nonce: header.nonce,
                    hash,
                    attempts,
                    elapsed: started.elapsed(),
                });
            }

            header.nonce = header.nonce.wrapping_add(1);
            if header.nonce == first {
                return Err(BlockProductionError::MiningFailed);
            }
        }
    }

    /// Run [`Self::mine`] on the blocking pool.
    #[instrument(skip(self, header, cancel), fields(number = header.number, difficulty = header.difficulty))]
    pub async fn mine_blocking(
        &self,
        mut header: BlockHeader,
        cancel: Cancellation,
    ) -> Result<(BlockHeader, MiningOutcome)> {
        let miner = self.clone();
        let (header, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = miner.mine(&mut header, &cancel);
            (header, outcome)
        })
        .await
        .map_err(|e| BlockProductionError::InternalError(format!("mining task failed: {e}")))?;

        let outcome = outcome?;
        debug!(
            nonce = outcome.nonce,
            attempts = outcome.attempts,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Nonce found"
        );
        Ok((header, outcome))
    }
}
