//! # Chain Auditor
//!
//! Re-checks persisted blocks without trusting anything stored alongside
//! them: header hash, parent link, height, authority signature, merkle root
//! and difficulty. Used to detect tampering or divergence after the fact.

use crate::domain::ConsensusResult;
use pc_02_chain_storage::BlockStore;
use pc_17_block_production::{meets_difficulty, MerkleTree};
use shared_crypto::{verify_block_signature, SignatureError};
use shared_types::{BlockData, ChainId, Hash};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Something wrong with one block.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditIssue {
    /// Stored hash differs from the hash of the stored header.
    HashMismatch,
    /// `prev_block_hash` does not point at the block below.
    BrokenLink { expected: Hash, actual: Hash },
    /// Heights are not consecutive.
    HeightGap { expected: u64, actual: u64 },
    /// Header signature does not verify against the validator key.
    BadSignature(SignatureError),
    /// `trans_root` does not match the block transactions.
    TransRootMismatch,
    /// Block hash does not meet the header difficulty.
    DifficultyNotMet,
}

/// Issue found at a given height.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditFinding {
    pub number: u64,
    pub issue: AuditIssue,
}

/// Result of auditing a range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    /// Blocks examined.
    pub checked: usize,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Audits blocks read through a `BlockStore`.
#[derive(Debug)]
pub struct ChainAuditor<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ChainAuditor<S>
where
    S: BlockStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Audit blocks `from..=to` of `chain_id`. The block below `from` is
    /// loaded as the link anchor but not itself audited.
    #[instrument(skip(self))]
    pub async fn verify_range(&self, chain_id: ChainId, from: u64, to: u64) -> ConsensusResult<AuditReport> {
        let start = from.saturating_sub(1);
        let blocks = self.store.list_in_between(chain_id, start, to).await?;

        let mut report = AuditReport::default();
        let mut previous: Option<&BlockData> = None;

        for block in &blocks {
            if block.header.number < from {
                previous = Some(block);
                continue;
            }
            report.checked += 1;
            for issue in Self::check_block(block, previous)? {
                warn!(number = block.header.number, ?issue, "Audit finding");
                report.findings.push(AuditFinding {
                    number: block.header.number,
                    issue,
                });
            }
            previous = Some(block);
        }

        Ok(report)
    }

    fn check_block(block: &BlockData, previous: Option<&BlockData>) -> ConsensusResult<Vec<AuditIssue>> {
        let mut issues = Vec::new();
        let header = &block.header;

        if block.verify_integrity().is_err() {
            issues.push(AuditIssue::HashMismatch);
        }

        if let Some(previous) = previous {
            let expected = previous.header.number + 1;
            if header.number != expected {
                issues.push(AuditIssue::HeightGap {
                    expected,
                    actual: header.number,
                });
            }
            if header.prev_block_hash != previous.hash {
                issues.push(AuditIssue::BrokenLink {
                    expected: previous.hash,
                    actual: header.prev_block_hash,
                });
            }
        }

        if let Err(e) = verify_block_signature(block) {
            issues.push(AuditIssue::BadSignature(e));
        }

        if MerkleTree::from_transactions(&block.transactions)?.root() != header.trans_root {
            issues.push(AuditIssue::TransRootMismatch);
        }

        // Genesis is not mined.
        if header.number > 0 && !meets_difficulty(&header.hash()?, header.difficulty) {
            issues.push(AuditIssue::DifficultyNotMet);
        }

        Ok(issues)
    }
}
