//! # Merkle Builder
//!
//! Binary merkle tree over the ordered block transactions. Each leaf is the
//! keccak-256 of a transaction's canonical encoding; each parent is
//! `keccak(left || right)`.
//!
//! ## Invariants
//!
//! - Leaves are padded to the next power of two (minimum 2) with a
//!   sentinel hash of all zeros.
//! - The same ordered transaction list always yields the same root.
//! - An empty list has the sentinel as its root.

use crate::error::{BlockProductionError, Result};
use serde::{Deserialize, Serialize};
use shared_types::{keccak256, to_hex, BlockTransaction, Hash};

/// Padding leaf (all zeros).
pub const SENTINEL_HASH: Hash = [0u8; 32];

/// A binary Merkle tree built from transaction leaf hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    /// Array form, root at index 0, children of `i` at `2i+1` and `2i+2`.
    nodes: Vec<Hash>,
    /// Number of actual transactions (before padding).
    transaction_count: usize,
    /// Number of leaves after padding to power of two.
    padded_leaf_count: usize,
}

impl MerkleTree {
    /// Build from block transactions, in order.
    pub fn from_transactions(transactions: &[BlockTransaction]) -> Result<Self> {
        let leaves = transactions
            .iter()
            .map(BlockTransaction::leaf_hash)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::build(leaves))
    }

    /// Build from leaf hashes.
    pub fn build(leaf_hashes: Vec<Hash>) -> Self {
        let transaction_count = leaf_hashes.len();

        if transaction_count == 0 {
            return Self {
                nodes: vec![SENTINEL_HASH],
                transaction_count: 0,
                padded_leaf_count: 0,
            };
        }

        // A single transaction still gets a sibling so the root is a pair hash.
        let padded_leaf_count = transaction_count.next_power_of_two().max(2);
        let mut leaves = leaf_hashes;
        leaves.resize(padded_leaf_count, SENTINEL_HASH);

        let total_nodes = 2 * padded_leaf_count - 1;
        let leaf_start = padded_leaf_count - 1;
        let mut nodes = vec![SENTINEL_HASH; total_nodes];
        nodes[leaf_start..].copy_from_slice(&leaves);

        for i in (0..leaf_start).rev() {
            nodes[i] = Self::hash_pair(&nodes[2 * i + 1], &nodes[2 * i + 2]);
        }

        Self {
            nodes,
            transaction_count,
            padded_leaf_count,
        }
    }

    /// Root hash.
    pub fn root(&self) -> Hash {
        self.nodes[0]
    }

    /// Root hash as lowercase hex.
    pub fn root_hex(&self) -> String {
        to_hex(&self.root())
    }

    /// Number of actual transactions (before padding).
    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    /// Number of leaves after padding.
    pub fn leaf_count(&self) -> usize {
        self.padded_leaf_count
    }

    /// Inclusion proof for the transaction at `tx_index`.
    pub fn generate_proof(&self, tx_index: usize) -> Result<MerkleProof> {
        if tx_index >= self.transaction_count {
            return Err(BlockProductionError::ProofIndexOutOfRange {
                index: tx_index,
                count: self.transaction_count,
            });
        }

        let mut current = self.padded_leaf_count - 1 + tx_index;
        let leaf_hash = self.nodes[current];
        let mut path = Vec::new();

        while current > 0 {
            // Even indices are right children.
            let (sibling, position) = if current % 2 == 0 {
                (current - 1, SiblingPosition::Left)
            } else {
                (current + 1, SiblingPosition::Right)
            };
            path.push(ProofNode {
                hash: self.nodes[sibling],
                position,
            });
            current = (current - 1) / 2;
        }

        Ok(MerkleProof {
            leaf_hash,
            tx_index,
            root: self.root(),
            path,
        })
    }

    /// Verify a proof against this tree's root.
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        Self::verify_proof_static(&proof.leaf_hash, &proof.path, &self.root())
    }

    /// Recompute the root from a leaf and its path and compare.
    pub fn verify_proof_static(leaf_hash: &Hash, path: &[ProofNode], expected_root: &Hash) -> bool {
        let mut current_hash = *leaf_hash;

        for node in path {
            current_hash = match node.position {
                SiblingPosition::Left => Self::hash_pair(&node.hash, &current_hash),
                SiblingPosition::Right => Self::hash_pair(&current_hash, &node.hash),
            };
        }

        current_hash == *expected_root
    }

    fn hash_pair(left: &Hash, right: &Hash) -> Hash {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(left);
        buf[32..].copy_from_slice(right);
        keccak256(&buf)
    }
}

/// Merkle root of block transactions as lowercase hex.
pub fn build_tree(transactions: &[BlockTransaction]) -> Result<String> {
    Ok(MerkleTree::from_transactions(transactions)?.root_hex())
}

/// Proof that one transaction is included under a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Leaf hash of the proven transaction.
    pub leaf_hash: Hash,
    /// Position of the transaction in the block.
    pub tx_index: usize,
    /// Root this proof verifies against.
    pub root: Hash,
    /// Sibling hashes from leaf to root.
    pub path: Vec<ProofNode>,
}

/// A single node in the Merkle proof path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    /// The sibling hash at this level.
    pub hash: Hash,
    /// Position of sibling (left or right).
    pub position: SiblingPosition,
}

/// Position of a sibling in the Merkle tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiblingPosition {
    /// Sibling is hashed on the left.
    Left,
    /// Sibling is hashed on the right.
    Right,
}
