//! # Genesis Bootstrap
//!
//! Writes block 0, the initial account allocations and the chain head in
//! one batch. Running it against an initialized chain changes nothing.

use crate::domain::{ConsensusError, ConsensusResult, StateError};
use pc_02_chain_storage::{ChainStateStore, TransactionRunner};
use pc_17_block_production::{hash_accounts, hash_tokens, BlockAssembler, MiningConfig};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{Account, BlockData, BlockchainState, ChainContext};
use tracing::{info, instrument};

/// Create the genesis block for `ctx.chain_id` unless the chain exists.
///
/// # Returns
///
/// The chain head: freshly written, or the one already stored.
#[instrument(skip_all, fields(chain_id = ctx.chain_id, accounts = allocations.len()))]
pub async fn bootstrap_genesis<S>(
    store: &S,
    authority_key: &Secp256k1KeyPair,
    ctx: &ChainContext,
    mining: &MiningConfig,
    allocations: &[Account],
    timestamp: u64,
) -> ConsensusResult<BlockchainState>
where
    S: ChainStateStore + TransactionRunner + ?Sized,
{
    if let Some(existing) = store.get_by_chain_id(ctx.chain_id).await? {
        info!(
            number = existing.latest_block_number,
            "Chain already initialized, genesis skipped"
        );
        return Ok(existing);
    }

    if authority_key.address() != ctx.authority_address {
        return Err(StateError::AuthorityMismatch {
            expected: ctx.authority_address,
            actual: authority_key.address(),
        }
        .into());
    }

    let state_root = hash_accounts(allocations)?;
    let tokens_root = hash_tokens(&[])?;
    let header = BlockAssembler::new(mining.clone())?.genesis_header(
        ctx.chain_id,
        ctx.authority_address,
        state_root,
        tokens_root,
        timestamp,
    );
    let signature = authority_key.sign_header(&header)?;
    let block = BlockData::new(header, signature, Vec::new(), ctx.authority.clone())?;

    let head = BlockchainState {
        chain_id: ctx.chain_id,
        latest_block_number: 0,
        latest_hash: block.hash,
        latest_token_id: 0,
        account_hash_state: state_root,
        token_hash_state: tokens_root,
    };

    let mut batch = store.begin();
    for account in allocations {
        batch.put_account(account.clone());
    }
    batch.put_block(block).put_chain_state(head.clone());
    store.commit(batch).await.map_err(ConsensusError::Commit)?;

    info!(hash = %hex::encode(head.latest_hash), "Genesis block written");
    Ok(head)
}
