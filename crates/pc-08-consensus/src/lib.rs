//! # pc-08-consensus
//!
//! Proof-of-authority consensus for PoA-Chain.
//!
//! ## Architecture
//!
//! A single authority signs every block. There is no voting: the
//! [`ConsensusCycle`] is the only writer of chain state and turns mempool
//! entries into blocks one at a time.
//!
//! ```text
//! [Mempool] --insertion--> ConsensusCycle
//!                             |  VALIDATE        TransactionValidator
//!                             |  MUTATE_STATE    mutator::apply + state roots
//!                             |  ASSEMBLE/MINE   pc-17 BlockAssembler
//!                             |  SIGN            authority key (KeyProvider)
//!                             v  COMMIT          one WriteBatch
//!          accounts, token, block, chain head, mempool delete
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pc_08_consensus::{ConsensusConfig, ConsensusCycle};
//!
//! let cycle = ConsensusCycle::new(store, keys, ctx, ConsensusConfig::default())?;
//! cycle.run(cancel).await?;
//! ```
//!
//! ## Guarantees
//!
//! - One block per mempool entry, in notification order
//! - `CONSENSUS_LOCK` held from validation to commit
//! - A failed commit writes nothing; the mempool entry stays for retry
//! - Rejected entries are reported and left in the mempool

pub mod config;
pub mod domain;
pub mod metrics;
pub mod service;

pub use config::ConsensusConfig;
pub use domain::*;
pub use metrics::{CycleMetrics, MetricsSnapshot};
pub use service::{
    bootstrap_genesis, AuditFinding, AuditIssue, AuditReport, ChainAuditor, CommittedBlock,
    ConsensusCycle, CycleOutcome, CycleState,
};
