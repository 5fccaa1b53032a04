//! # Write Batches
//!
//! A `WriteBatch` collects the writes of one unit of work. Nothing is
//! visible until `TransactionRunner::commit` applies the whole batch;
//! dropping an uncommitted batch aborts it.

use shared_types::{Account, BlockData, BlockchainState, Token};
use std::fmt;
use uuid::Uuid;

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or replace an account.
    PutAccount(Account),
    /// Insert or replace a token.
    PutToken(Token),
    /// Insert or replace a block.
    PutBlock(Box<BlockData>),
    /// Insert or replace the chain head row.
    PutChainState(BlockchainState),
    /// Remove a consumed mempool entry.
    DeleteMempool(Uuid),
}

/// Which table a write touches. Used for fault injection and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    /// Account table.
    Account,
    /// Token table.
    Token,
    /// Block table.
    Block,
    /// Chain state table.
    ChainState,
    /// Mempool table.
    Mempool,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteKind::Account => "account",
            WriteKind::Token => "token",
            WriteKind::Block => "block",
            WriteKind::ChainState => "chain_state",
            WriteKind::Mempool => "mempool",
        };
        f.write_str(name)
    }
}

impl WriteOp {
    /// Table this write touches.
    pub fn kind(&self) -> WriteKind {
        match self {
            WriteOp::PutAccount(_) => WriteKind::Account,
            WriteOp::PutToken(_) => WriteKind::Token,
            WriteOp::PutBlock(_) => WriteKind::Block,
            WriteOp::PutChainState(_) => WriteKind::ChainState,
            WriteOp::DeleteMempool(_) => WriteKind::Mempool,
        }
    }
}

/// Ordered writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an account write.
    pub fn put_account(&mut self, account: Account) -> &mut Self {
        self.ops.push(WriteOp::PutAccount(account));
        self
    }

    /// Queue a token write.
    pub fn put_token(&mut self, token: Token) -> &mut Self {
        self.ops.push(WriteOp::PutToken(token));
        self
    }

    /// Queue a block write.
    pub fn put_block(&mut self, block: BlockData) -> &mut Self {
        self.ops.push(WriteOp::PutBlock(Box::new(block)));
        self
    }

    /// Queue a chain head update.
    pub fn put_chain_state(&mut self, state: BlockchainState) -> &mut Self {
        self.ops.push(WriteOp::PutChainState(state));
        self
    }

    /// Queue removal of a mempool entry.
    pub fn delete_mempool(&mut self, id: Uuid) -> &mut Self {
        self.ops.push(WriteOp::DeleteMempool(id));
        self
    }

    /// Number of queued writes.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued writes in order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consume into the queued writes.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
