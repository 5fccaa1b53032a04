//! Metrics collection for the consensus cycle

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters updated by the consensus cycle
#[derive(Debug, Default)]
pub struct CycleMetrics {
    /// Blocks committed
    pub blocks_committed: AtomicU64,

    /// Mempool entries rejected by validation
    pub validation_rejections: AtomicU64,

    /// Atomic commits that failed
    pub commit_failures: AtomicU64,

    /// Mining runs interrupted by cancellation or deadline
    pub mining_cancellations: AtomicU64,

    /// Entries skipped because they were already gone from the mempool
    pub entries_skipped: AtomicU64,

    /// Total nonces tried
    pub mining_attempts: AtomicU64,

    /// Total nonce search time (milliseconds)
    pub mining_time_ms: AtomicU64,
}

/// Point-in-time copy of [`CycleMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub blocks_committed: u64,
    pub validation_rejections: u64,
    pub commit_failures: u64,
    pub mining_cancellations: u64,
    pub entries_skipped: u64,
    pub mining_attempts: u64,
    pub mining_time_ms: u64,
}

impl CycleMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed block and the search that produced it
    pub fn record_block_committed(&self, attempts: u64, elapsed: Duration) {
        self.blocks_committed.fetch_add(1, Ordering::Relaxed);
        self.mining_attempts.fetch_add(attempts, Ordering::Relaxed);
        self.mining_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit_failure(&self) {
        self.commit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mining_cancelled(&self) {
        self.mining_cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.entries_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get blocks committed
    pub fn get_blocks_committed(&self) -> u64 {
        self.blocks_committed.load(Ordering::Relaxed)
    }

    /// Get average nonces tried per block
    pub fn get_avg_attempts_per_block(&self) -> f64 {
        let blocks = self.blocks_committed.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        self.mining_attempts.load(Ordering::Relaxed) as f64 / blocks as f64
    }

    /// Copy every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            blocks_committed: self.blocks_committed.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            commit_failures: self.commit_failures.load(Ordering::Relaxed),
            mining_cancellations: self.mining_cancellations.load(Ordering::Relaxed),
            entries_skipped: self.entries_skipped.load(Ordering::Relaxed),
            mining_attempts: self.mining_attempts.load(Ordering::Relaxed),
            mining_time_ms: self.mining_time_ms.load(Ordering::Relaxed),
        }
    }
}
