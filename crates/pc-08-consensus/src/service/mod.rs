//! Consensus service: the cycle, genesis bootstrap and the chain auditor.

pub mod auditor;
pub mod cycle;
pub mod genesis;

pub use auditor::{AuditFinding, AuditIssue, AuditReport, ChainAuditor};
pub use cycle::{CommittedBlock, ConsensusCycle, CycleOutcome, CycleState};
pub use genesis::bootstrap_genesis;

#[cfg(test)]
mod tests;
