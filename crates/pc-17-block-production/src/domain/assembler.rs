//! # Block Assembler
//!
//! Builds the next header on top of the previous block: height and parent
//! link, monotonic timestamp, merkle root of the block transactions, state
//! and token roots. The header is then handed to the miner and the block
//! hash is the hash of the mined header.

use crate::config::MiningConfig;
use crate::domain::merkle::MerkleTree;
use crate::domain::miner::{DifficultyMiner, MiningOutcome};
use crate::error::Result;
use shared_types::{
    Address, BlockData, BlockHeader, BlockTransaction, Cancellation, ChainId, Hash, SignedTransaction,
    TokenId, ZERO_HASH,
};
use tracing::instrument;

/// Everything the next header depends on.
#[derive(Debug, Clone)]
pub struct AssemblyInput<'a> {
    /// Current chain head.
    pub previous: &'a BlockData,
    /// Transactions of the new block, in order.
    pub transactions: Vec<BlockTransaction>,
    /// Account-set hash after applying the transactions.
    pub state_root: Hash,
    /// Token-set hash after applying the transactions.
    pub tokens_root: Hash,
    /// Highest allocated token id after applying the transactions.
    pub latest_token_id: TokenId,
    /// Block producer.
    pub beneficiary: Address,
    /// Unix seconds at assembly.
    pub now: u64,
}

/// A header ready for mining and its transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBlock {
    /// Header with nonce not yet searched.
    pub header: BlockHeader,
    /// Block transactions, in order.
    pub transactions: Vec<BlockTransaction>,
}

/// A mined header, its hash and transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedBlock {
    /// Header with the winning nonce.
    pub header: BlockHeader,
    /// Hash of `header`.
    pub hash: Hash,
    /// Block transactions, in order.
    pub transactions: Vec<BlockTransaction>,
    /// Search statistics.
    pub outcome: MiningOutcome,
}

/// Assembles and mines blocks.
#[derive(Debug, Clone)]
pub struct BlockAssembler {
    config: MiningConfig,
    miner: DifficultyMiner,
}

impl BlockAssembler {
    /// Assembler for `config`.
    pub fn new(config: MiningConfig) -> Result<Self> {
        config.validate()?;
        let miner = DifficultyMiner::new(&config);
        Ok(Self { config, miner })
    }

    /// Settings in use.
    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Record a signed transaction for inclusion at `timestamp`.
    pub fn block_transaction(&self, signed: SignedTransaction, timestamp: u64) -> BlockTransaction {
        let gas_units = self.config.gas_units(signed.transaction.kind);
        BlockTransaction {
            signed,
            timestamp,
            gas_price: self.config.gas_price,
            gas_units,
        }
    }

    /// Build the unmined header for the block after `input.previous`.
    pub fn assemble(&self, input: AssemblyInput<'_>) -> Result<PendingBlock> {
        let previous = &input.previous.header;
        let trans_root = MerkleTree::from_transactions(&input.transactions)?.root();

        let header = BlockHeader {
            chain_id: previous.chain_id,
            number: previous.number + 1,
            prev_block_hash: input.previous.hash,
            timestamp: input.now.max(previous.timestamp),
            beneficiary: input.beneficiary,
            difficulty: self.config.difficulty,
            mining_reward: self.config.mining_reward,
            state_root: input.state_root,
            trans_root,
            nonce: 0,
            latest_token_id: input.latest_token_id,
            tokens_root: input.tokens_root,
        };

        Ok(PendingBlock {
            header,
            transactions: input.transactions,
        })
    }

    /// Search a nonce for a pending block.
    #[instrument(skip(self, pending, cancel), fields(number = pending.header.number))]
    pub async fn mine(&self, pending: PendingBlock, cancel: Cancellation) -> Result<MinedBlock> {
        let (header, outcome) = self.miner.mine_blocking(pending.header, cancel).await?;
        let hash = header.hash()?;
        Ok(MinedBlock {
            header,
            hash,
            transactions: pending.transactions,
            outcome,
        })
    }

    /// Assemble then mine.
    pub async fn build(&self, input: AssemblyInput<'_>, cancel: Cancellation) -> Result<MinedBlock> {
        let pending = self.assemble(input)?;
        self.mine(pending, cancel).await
    }

    /// Header of block 0. Not mined: genesis carries the configured
    /// difficulty but nonce 0.
    pub fn genesis_header(
        &self,
        chain_id: ChainId,
        beneficiary: Address,
        state_root: Hash,
        tokens_root: Hash,
        timestamp: u64,
    ) -> BlockHeader {
        BlockHeader {
            chain_id,
            number: 0,
            prev_block_hash: ZERO_HASH,
            timestamp,
            beneficiary,
            difficulty: self.config.difficulty,
            mining_reward: 0,
            state_root,
            trans_root: MerkleTree::build(Vec::new()).root(),
            nonce: 0,
            latest_token_id: 0,
            tokens_root,
        }
    }
}
