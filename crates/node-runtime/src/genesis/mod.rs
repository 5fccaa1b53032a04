//! # Genesis Module
//!
//! Chain initialization on node start.
//!
//! The genesis block has special properties:
//!
//! - Number: 0
//! - Previous hash: 32 zero bytes
//! - Transactions: none (empty merkle root)
//! - State root: hash of the initial allocation
//! - Signed by the authority like every other block
//!
//! ## Initialization Sequence
//!
//! 1. Look up the chain head for the configured chain id
//! 2. If present, keep it (restart)
//! 3. Otherwise fund the authority, write block 0 and the head in one batch

use crate::container::SubsystemContainer;
use anyhow::{Context, Result};
use pc_08_consensus::bootstrap_genesis;
use shared_types::{unix_seconds, Account, BlockchainState};
use tracing::info;

/// Initial accounts: the authority with the configured balance.
pub fn allocations(container: &SubsystemContainer) -> Vec<Account> {
    vec![Account::new(
        container.ctx.authority_address,
        container.config.genesis.authority_balance,
    )]
}

/// Write the genesis block if the chain is empty.
pub async fn initialize_genesis(container: &SubsystemContainer) -> Result<BlockchainState> {
    info!("Checking for genesis block...");

    let head = bootstrap_genesis(
        &*container.store,
        &container.authority_key,
        &container.ctx,
        &container.config.consensus.mining,
        &allocations(container),
        unix_seconds(),
    )
    .await
    .context("Failed to initialize genesis block")?;

    info!(
        number = head.latest_block_number,
        hash = %hex::encode(&head.latest_hash[..8]),
        chain_id = head.chain_id,
        "Chain head ready"
    );
    Ok(head)
}
