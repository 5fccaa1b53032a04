//! # Outbound Ports (Driven Ports)
//!
//! The stores the consensus cycle and the requesters depend on.
//!
//! Production deployments back these with a transactional document store;
//! tests and single-process nodes use `InMemoryChainStore`.

use crate::adapters::notifications::InsertionStream;
use crate::domain::{Result, WriteBatch};
use async_trait::async_trait;
use shared_types::{
    Account, Address, BlockData, BlockchainState, ChainId, Hash, MempoolTransaction, Token, TokenId,
};
use uuid::Uuid;

/// Pending signed transactions.
#[async_trait]
pub trait MempoolStore: Send + Sync {
    /// Add a new entry. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, entry: MempoolTransaction) -> Result<()>;

    /// Add or replace an entry. Replacing keeps the original queue position.
    async fn upsert(&self, entry: MempoolTransaction) -> Result<()>;

    /// Look up an entry by id.
    async fn get(&self, id: &Uuid) -> Result<Option<MempoolTransaction>>;

    /// Entries for a chain, oldest first.
    async fn list_by_chain_id(&self, chain_id: ChainId) -> Result<Vec<MempoolTransaction>>;

    /// Remove every entry for a chain, returning how many were removed.
    async fn delete_by_chain_id(&self, chain_id: ChainId) -> Result<usize>;

    /// Stream of entries inserted for `chain_id` from now on.
    fn subscribe_to_insertions(&self, chain_id: ChainId) -> InsertionStream;
}

/// Coin balance ledger.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Account by address.
    async fn get_by_address(&self, address: &Address) -> Result<Option<Account>>;

    /// Insert or replace an account.
    async fn upsert(&self, account: Account) -> Result<()>;

    /// Every account, in no particular order.
    async fn list_all(&self) -> Result<Vec<Account>>;
}

/// Non-fungible token records.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Token by id.
    async fn get_by_id(&self, id: TokenId) -> Result<Option<Token>>;

    /// Insert or replace a token.
    async fn upsert(&self, token: Token) -> Result<()>;

    /// Every token, in no particular order.
    async fn list_all(&self) -> Result<Vec<Token>>;
}

/// Persisted blocks.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Block by hash.
    async fn get_by_hash(&self, hash: &Hash) -> Result<Option<BlockData>>;

    /// Insert or replace a block. The stored hash must match its header.
    async fn upsert(&self, block: BlockData) -> Result<()>;

    /// Blocks of `chain_id` with `from <= number <= to`, ascending.
    async fn list_in_between(&self, chain_id: ChainId, from: u64, to: u64) -> Result<Vec<BlockData>>;
}

/// Chain head pointer, one row per chain id.
#[async_trait]
pub trait ChainStateStore: Send + Sync {
    /// Head row for a chain.
    async fn get_by_chain_id(&self, chain_id: ChainId) -> Result<Option<BlockchainState>>;

    /// Insert or replace the head row.
    async fn upsert(&self, state: BlockchainState) -> Result<()>;
}

/// Atomic multi-store writes spanning mempool, accounts, tokens, blocks and
/// chain state.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    /// Start a unit of work.
    fn begin(&self) -> WriteBatch {
        WriteBatch::new()
    }

    /// Apply every write in `batch`, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Discard a unit of work.
    fn abort(&self, batch: WriteBatch) {
        tracing::debug!(writes = batch.len(), "Write batch aborted");
    }
}

/// Every store the consensus cycle needs, behind one handle.
pub trait ChainStore:
    MempoolStore + AccountStore + TokenStore + BlockStore + ChainStateStore + TransactionRunner
{
}

impl<T> ChainStore for T where
    T: MempoolStore + AccountStore + TokenStore + BlockStore + ChainStateStore + TransactionRunner
{
}
