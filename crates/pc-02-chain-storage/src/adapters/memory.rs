//! # In-Memory Chain Store
//!
//! Implements every store port over process memory.
//!
//! `commit` applies a batch to a copy of the tables and swaps the copy in
//! only when every write succeeded, so a failing write leaves nothing
//! behind. A fault injector can force a chosen write kind to fail, which is
//! how the rollback path is exercised.

use crate::adapters::notifications::InsertionStream;
use crate::domain::{Result, StorageError, StoreConfig, WriteBatch, WriteKind, WriteOp};
use crate::ports::{AccountStore, BlockStore, ChainStateStore, MempoolStore, TokenStore, TransactionRunner};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    to_hex, Account, Address, BlockData, BlockchainState, ChainId, Hash, MempoolTransaction, Token,
    TokenId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    /// Queue position -> entry.
    mempool: BTreeMap<u64, MempoolTransaction>,
    /// Entry id -> queue position.
    mempool_index: HashMap<Uuid, u64>,
    next_seq: u64,
    accounts: HashMap<Address, Account>,
    tokens: HashMap<TokenId, Token>,
    blocks: HashMap<Hash, BlockData>,
    chain_states: HashMap<ChainId, BlockchainState>,
}

impl Tables {
    fn push_mempool(&mut self, entry: MempoolTransaction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.mempool_index.insert(entry.id, seq);
        self.mempool.insert(seq, entry);
    }

    fn remove_mempool(&mut self, id: &Uuid) -> Option<MempoolTransaction> {
        let seq = self.mempool_index.remove(id)?;
        self.mempool.remove(&seq)
    }

    fn apply(&mut self, op: WriteOp) -> Result<()> {
        match op {
            WriteOp::PutAccount(account) => {
                self.accounts.insert(account.address, account);
            }
            WriteOp::PutToken(token) => {
                self.tokens.insert(token.id, token);
            }
            WriteOp::PutBlock(block) => {
                block.verify_integrity()?;
                self.blocks.insert(block.hash, *block);
            }
            WriteOp::PutChainState(state) => {
                self.chain_states.insert(state.chain_id, state);
            }
            WriteOp::DeleteMempool(id) => {
                if self.remove_mempool(&id).is_none() {
                    return Err(StorageError::NotFound {
                        kind: "mempool entry",
                        key: id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Process-local implementation of every store port.
pub struct InMemoryChainStore {
    tables: RwLock<Tables>,
    notifier: broadcast::Sender<MempoolTransaction>,
    failing: Mutex<HashSet<WriteKind>>,
}

impl Default for InMemoryChainStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl InMemoryChainStore {
    /// Empty store.
    pub fn new(config: StoreConfig) -> Self {
        let (notifier, _) = broadcast::channel(config.notification_capacity.max(1));
        Self {
            tables: RwLock::new(Tables::default()),
            notifier,
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Make every committed write of `kind` fail until cleared.
    pub fn inject_fault(&self, kind: WriteKind) {
        self.failing.lock().insert(kind);
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.failing.lock().clear();
    }

    /// Number of pending mempool entries across all chains.
    pub fn mempool_len(&self) -> usize {
        self.tables.read().mempool.len()
    }

    fn notify(&self, entry: MempoolTransaction) {
        // No subscribers is not an error.
        let _ = self.notifier.send(entry);
    }
}

#[async_trait]
impl MempoolStore for InMemoryChainStore {
    async fn insert(&self, entry: MempoolTransaction) -> Result<()> {
        {
            let mut tables = self.tables.write();
            if tables.mempool_index.contains_key(&entry.id) {
                return Err(StorageError::Duplicate {
                    kind: "mempool entry",
                    key: entry.id.to_string(),
                });
            }
            tables.push_mempool(entry.clone());
        }
        debug!(id = %entry.id, chain_id = entry.chain_id(), "Mempool entry inserted");
        self.notify(entry);
        Ok(())
    }

    async fn upsert(&self, entry: MempoolTransaction) -> Result<()> {
        let is_new = {
            let mut tables = self.tables.write();
            match tables.mempool_index.get(&entry.id).copied() {
                Some(seq) => {
                    tables.mempool.insert(seq, entry.clone());
                    false
                }
                None => {
                    tables.push_mempool(entry.clone());
                    true
                }
            }
        };
        if is_new {
            self.notify(entry);
        }
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<MempoolTransaction>> {
        let tables = self.tables.read();
        Ok(tables
            .mempool_index
            .get(id)
            .and_then(|seq| tables.mempool.get(seq))
            .cloned())
    }

    async fn list_by_chain_id(&self, chain_id: ChainId) -> Result<Vec<MempoolTransaction>> {
        Ok(self
            .tables
            .read()
            .mempool
            .values()
            .filter(|entry| entry.chain_id() == chain_id)
            .cloned()
            .collect())
    }

    async fn delete_by_chain_id(&self, chain_id: ChainId) -> Result<usize> {
        let mut tables = self.tables.write();
        let ids: Vec<Uuid> = tables
            .mempool
            .values()
            .filter(|entry| entry.chain_id() == chain_id)
            .map(|entry| entry.id)
            .collect();
        for id in &ids {
            tables.remove_mempool(id);
        }
        Ok(ids.len())
    }

    fn subscribe_to_insertions(&self, chain_id: ChainId) -> InsertionStream {
        InsertionStream::new(chain_id, self.notifier.subscribe())
    }
}

#[async_trait]
impl AccountStore for InMemoryChainStore {
    async fn get_by_address(&self, address: &Address) -> Result<Option<Account>> {
        Ok(self.tables.read().accounts.get(address).cloned())
    }

    async fn upsert(&self, account: Account) -> Result<()> {
        self.tables.write().accounts.insert(account.address, account);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Account>> {
        Ok(self.tables.read().accounts.values().cloned().collect())
    }
}

#[async_trait]
impl TokenStore for InMemoryChainStore {
    async fn get_by_id(&self, id: TokenId) -> Result<Option<Token>> {
        Ok(self.tables.read().tokens.get(&id).cloned())
    }

    async fn upsert(&self, token: Token) -> Result<()> {
        self.tables.write().tokens.insert(token.id, token);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Token>> {
        Ok(self.tables.read().tokens.values().cloned().collect())
    }
}

#[async_trait]
impl BlockStore for InMemoryChainStore {
    async fn get_by_hash(&self, hash: &Hash) -> Result<Option<BlockData>> {
        Ok(self.tables.read().blocks.get(hash).cloned())
    }

    async fn upsert(&self, block: BlockData) -> Result<()> {
        block.verify_integrity()?;
        self.tables.write().blocks.insert(block.hash, block);
        Ok(())
    }

    async fn list_in_between(&self, chain_id: ChainId, from: u64, to: u64) -> Result<Vec<BlockData>> {
        let mut blocks: Vec<BlockData> = self
            .tables
            .read()
            .blocks
            .values()
            .filter(|b| b.header.chain_id == chain_id && (from..=to).contains(&b.header.number))
            .cloned()
            .collect();
        blocks.sort_by_key(|b| b.header.number);
        Ok(blocks)
    }
}

#[async_trait]
impl ChainStateStore for InMemoryChainStore {
    async fn get_by_chain_id(&self, chain_id: ChainId) -> Result<Option<BlockchainState>> {
        Ok(self.tables.read().chain_states.get(&chain_id).cloned())
    }

    async fn upsert(&self, state: BlockchainState) -> Result<()> {
        self.tables.write().chain_states.insert(state.chain_id, state);
        Ok(())
    }
}

#[async_trait]
impl TransactionRunner for InMemoryChainStore {
    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let failing = self.failing.lock().clone();
        let writes = batch.len();

        let mut tables = self.tables.write();
        let mut staged = tables.clone();
        for op in batch.into_ops() {
            let kind = op.kind();
            if failing.contains(&kind) {
                warn!(%kind, "Injected write fault, batch rolled back");
                return Err(StorageError::InjectedFault(kind.to_string()));
            }
            staged.apply(op)?;
        }
        *tables = staged;
        debug!(writes, "Write batch committed");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryChainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("InMemoryChainStore")
            .field("mempool", &tables.mempool.len())
            .field("accounts", &tables.accounts.len())
            .field("tokens", &tables.tokens.len())
            .field("blocks", &tables.blocks.len())
            .field(
                "heads",
                &tables
                    .chain_states
                    .values()
                    .map(|s| (s.chain_id, to_hex(&s.latest_hash)))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
