//! # Mempool Submitter
//!
//! Entry point for transactions signed elsewhere (wallets, gossip). Only
//! the cheap stateless checks run here; the consensus cycle validates
//! again against state before inclusion.

use super::enqueue;
use crate::domain::{RequesterError, Result};
use pc_02_chain_storage::ChainStore;
use shared_crypto::verify_signature;
use shared_types::{ChainId, SignedTransaction};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Admits externally signed transactions.
pub struct MempoolSubmitter {
    store: Arc<dyn ChainStore>,
    chain_id: ChainId,
}

impl MempoolSubmitter {
    pub fn new(store: Arc<dyn ChainStore>, chain_id: ChainId) -> Self {
        Self { store, chain_id }
    }

    /// Check chain id and signature, then queue.
    #[instrument(skip(self, signed), fields(chain_id = self.chain_id))]
    pub async fn submit(&self, signed: SignedTransaction) -> Result<Uuid> {
        let actual = signed.transaction.chain_id;
        if actual != self.chain_id {
            return Err(RequesterError::ChainMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        if let Err(e) = verify_signature(&signed) {
            warn!(error = %e, "Submission rejected");
            return Err(e.into());
        }
        enqueue(&*self.store, signed).await
    }
}
