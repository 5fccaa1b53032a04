//! Requesters: build, sign and enqueue transactions.
//!
//! None of them touch chain state. They read it to pick ids and nonces,
//! then hand a `MempoolTransaction` to the store; the consensus cycle does
//! the rest.

pub mod coin;
pub mod submit;
pub mod token;

pub use coin::CoinRequester;
pub use submit::MempoolSubmitter;
pub use token::TokenRequester;

use crate::domain::{RequesterError, Result};
use pc_02_chain_storage::{BlockStore, ChainStateStore, ChainStore, MempoolStore};
use shared_crypto::validator_address;
use shared_types::{
    unix_millis, Address, BlockchainState, ChainContext, MempoolTransaction, SignedTransaction,
};
use tracing::debug;
use uuid::Uuid;


/// Chain head plus the authority that signed the head block.
async fn current_head(store: &dyn ChainStore, ctx: &ChainContext) -> Result<(BlockchainState, Address)> {
    let state = store
        .get_by_chain_id(ctx.chain_id)
        .await?
        .ok_or(RequesterError::MissingChainState(ctx.chain_id))?;
    let head = store
        .get_by_hash(&state.latest_hash)
        .await?
        .ok_or(RequesterError::MissingHeadBlock(state.latest_hash))?;

    let authority = validator_address(&head.validator)?;
    if authority != ctx.authority_address {
        return Err(RequesterError::AuthorityMismatch {
            expected: ctx.authority_address,
            actual: authority,
        });
    }
    Ok((state, authority))
}

/// Wrap and insert; returns the mempool id.
async fn enqueue(store: &dyn ChainStore, signed: SignedTransaction) -> Result<Uuid> {
    let entry = MempoolTransaction::new(signed, unix_millis());
    let id = entry.id;
    store.insert(entry).await?;
    debug!(mempool_id = %id, "Transaction enqueued");
    Ok(id)
}
