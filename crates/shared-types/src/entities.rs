//! # Core Domain Entities
//!
//! The chain's data model: transfer intents, their signed and mempool forms,
//! block transactions, headers, persisted blocks, the chain head pointer and
//! the account/token ledgers.
//!
//! ## Clusters
//!
//! - **Intake**: `Transaction`, `SignedTransaction`, `MempoolTransaction`
//! - **Chain**: `BlockTransaction`, `BlockHeader`, `BlockData`, `BlockchainState`
//! - **State**: `Account`, `Token`
//! - **Authority**: `Validator`
//!
//! Big integers (signature components and nonces) are `U256` in memory and
//! decimal strings at the serde boundary, so document stores without
//! arbitrary-precision integers can hold them losslessly.

use crate::codec::{canonical_hash, CodecError};
use crate::serde_helpers::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use uuid::Uuid;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// A 32-byte keccak-256 hash.
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Chain identifier.
pub type ChainId = u64;

/// Numeric token identifier, allocated monotonically per chain.
pub type TokenId = u64;

/// Hash of nothing; used as the parent of the genesis block.
pub const ZERO_HASH: Hash = [0u8; 32];

// =============================================================================
// CLUSTER A: INTAKE
// =============================================================================

/// Which ledger a transaction moves value on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Fungible coin transfer; `value` is meaningful.
    Coin,
    /// Non-fungible token mint or transfer; `token_*` fields are meaningful.
    Token,
}

/// An unsigned transfer intent.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Chain this intent is valid on.
    pub chain_id: ChainId,
    /// Sender's account nonce at signing time.
    #[serde_as(as = "Decimal")]
    pub nonce: U256,
    /// Sender address.
    #[serde_as(as = "Hex")]
    pub from: Address,
    /// Recipient address.
    #[serde_as(as = "Hex")]
    pub to: Address,
    /// Coin amount. Always zero for token transactions.
    pub value: u64,
    /// Tip offered to the authority.
    pub tip: u64,
    /// Free-form payload.
    #[serde_as(as = "Hex")]
    pub data: Vec<u8>,
    /// Coin or token.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Token being minted or transferred.
    pub token_id: TokenId,
    /// Metadata location of the token.
    pub token_metadata_uri: String,
    /// Token version this transaction produces.
    #[serde_as(as = "Decimal")]
    pub token_nonce: U256,
}

impl Transaction {
    /// Build a coin transfer intent.
    pub fn coin(chain_id: ChainId, nonce: U256, from: Address, to: Address, value: u64) -> Self {
        Self {
            chain_id,
            nonce,
            from,
            to,
            value,
            tip: 0,
            data: Vec::new(),
            kind: TransactionKind::Coin,
            token_id: 0,
            token_metadata_uri: String::new(),
            token_nonce: U256::zero(),
        }
    }

    /// Build a token mint/transfer intent.
    pub fn token(
        chain_id: ChainId,
        nonce: U256,
        from: Address,
        to: Address,
        token_id: TokenId,
        token_metadata_uri: impl Into<String>,
        token_nonce: U256,
    ) -> Self {
        Self {
            chain_id,
            nonce,
            from,
            to,
            value: 0,
            tip: 0,
            data: Vec::new(),
            kind: TransactionKind::Token,
            token_id,
            token_metadata_uri: token_metadata_uri.into(),
            token_nonce,
        }
    }

    /// Hash of the canonical encoding; this is the message that gets signed.
    pub fn signing_hash(&self) -> Result<Hash, CodecError> {
        canonical_hash(self)
    }
}

/// A transaction plus its ECDSA signature.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The signed intent.
    pub transaction: Transaction,
    /// Recovery id (0/1, or 27/28 legacy form).
    #[serde_as(as = "Decimal")]
    pub v: U256,
    /// Signature R component.
    #[serde_as(as = "Decimal")]
    pub r: U256,
    /// Signature S component.
    #[serde_as(as = "Decimal")]
    pub s: U256,
}

impl SignedTransaction {
    /// Hash identifying this signed transaction (covers the signature).
    pub fn hash(&self) -> Result<Hash, CodecError> {
        canonical_hash(self)
    }
}

/// A signed transaction waiting for block inclusion.
///
/// Exists only between submission and the commit that includes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolTransaction {
    /// Unique mempool entry id.
    pub id: Uuid,
    /// The pending transaction.
    pub signed: SignedTransaction,
    /// Submission time (unix millis).
    pub received_at: u64,
}

impl MempoolTransaction {
    /// Wrap a signed transaction under a fresh id.
    pub fn new(signed: SignedTransaction, received_at: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            signed,
            received_at,
        }
    }

    /// Chain the wrapped transaction targets.
    pub fn chain_id(&self) -> ChainId {
        self.signed.transaction.chain_id
    }
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// A transaction permanently recorded in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransaction {
    /// The included transaction.
    pub signed: SignedTransaction,
    /// Inclusion time (unix seconds).
    pub timestamp: u64,
    /// Gas price recorded at inclusion.
    pub gas_price: u64,
    /// Gas units charged for the transaction kind.
    pub gas_units: u64,
}

impl BlockTransaction {
    /// Merkle leaf hash of this transaction.
    pub fn leaf_hash(&self) -> Result<Hash, CodecError> {
        canonical_hash(self)
    }
}

/// Per-block metadata. The block hash is the keccak of this header's
/// canonical encoding, nonce included.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain this block belongs to.
    pub chain_id: ChainId,
    /// Height; `previous.number + 1`.
    pub number: u64,
    /// Hash of the previous block.
    #[serde_as(as = "Hex")]
    pub prev_block_hash: Hash,
    /// Unix seconds; never below the parent's timestamp.
    pub timestamp: u64,
    /// Address credited as block producer.
    #[serde_as(as = "Hex")]
    pub beneficiary: Address,
    /// Required leading zero hex digits of the block hash.
    pub difficulty: u16,
    /// Reward recorded for the block producer.
    pub mining_reward: u64,
    /// Account set hash after this block.
    #[serde_as(as = "Hex")]
    pub state_root: Hash,
    /// Merkle root of the block transactions.
    #[serde_as(as = "Hex")]
    pub trans_root: Hash,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Highest token id allocated after this block.
    pub latest_token_id: TokenId,
    /// Token set hash after this block.
    #[serde_as(as = "Hex")]
    pub tokens_root: Hash,
}

impl BlockHeader {
    /// Canonical header bytes; these are what the authority signs.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CodecError> {
        crate::codec::canonical_bytes(self)
    }

    /// Block hash of this header as it currently stands.
    pub fn hash(&self) -> Result<Hash, CodecError> {
        canonical_hash(self)
    }
}

/// The proof-of-authority identity that signs every block header.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Human-readable validator id.
    pub id: String,
    /// SEC1 compressed secp256k1 public key.
    #[serde_as(as = "Hex")]
    pub public_key: Vec<u8>,
}

/// A persisted block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    /// Hash of `header`. Recomputed on construction, never trusted from input.
    #[serde_as(as = "Hex")]
    pub hash: Hash,
    /// Block header.
    pub header: BlockHeader,
    /// Authority signature over the header bytes (r || s || v).
    #[serde_as(as = "Hex")]
    pub header_signature: Vec<u8>,
    /// Included transactions, in order.
    pub transactions: Vec<BlockTransaction>,
    /// Authority that signed the header.
    pub validator: Validator,
}

impl BlockData {
    /// Assemble a block, deriving `hash` from the header.
    pub fn new(
        header: BlockHeader,
        header_signature: Vec<u8>,
        transactions: Vec<BlockTransaction>,
        validator: Validator,
    ) -> Result<Self, CodecError> {
        let hash = header.hash()?;
        Ok(Self {
            hash,
            header,
            header_signature,
            transactions,
            validator,
        })
    }

    /// Check the stored hash against a fresh hash of the header.
    pub fn verify_integrity(&self) -> Result<(), CodecError> {
        let actual = self.header.hash()?;
        if actual != self.hash {
            return Err(CodecError::HashMismatch {
                expected: hex::encode(self.hash),
                actual: hex::encode(actual),
            });
        }
        Ok(())
    }
}

/// Chain head pointer. Exactly one live row per chain id.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainState {
    /// Chain id this row describes.
    pub chain_id: ChainId,
    /// Height of the head block.
    pub latest_block_number: u64,
    /// Hash of the head block.
    #[serde_as(as = "Hex")]
    pub latest_hash: Hash,
    /// Highest allocated token id.
    pub latest_token_id: TokenId,
    /// Account set hash at the head.
    #[serde_as(as = "Hex")]
    pub account_hash_state: Hash,
    /// Token set hash at the head.
    #[serde_as(as = "Hex")]
    pub token_hash_state: Hash,
}

// =============================================================================
// CLUSTER C: STATE
// =============================================================================

/// Coin balance ledger entry.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account address.
    #[serde_as(as = "Hex")]
    pub address: Address,
    /// Monotonic counter.
    #[serde_as(as = "Decimal")]
    pub nonce: U256,
    /// Coin balance. Unsigned, so never negative.
    pub balance: u64,
}

impl Account {
    /// A fresh account with nonce 0.
    pub fn new(address: Address, balance: u64) -> Self {
        Self {
            address,
            nonce: U256::zero(),
            balance,
        }
    }
}

/// Non-fungible asset record.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token id.
    pub id: TokenId,
    /// Current owner.
    #[serde_as(as = "Hex")]
    pub owner: Address,
    /// Metadata location.
    pub metadata_uri: String,
    /// Version counter; the highest nonce wins.
    #[serde_as(as = "Decimal")]
    pub nonce: U256,
}
