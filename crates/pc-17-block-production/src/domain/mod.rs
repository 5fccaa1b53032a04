//! Block production domain: merkle tree, state hashing, mining, assembly.

pub mod assembler;
pub mod merkle;
pub mod miner;
pub mod state_hasher;

pub use assembler::{AssemblyInput, BlockAssembler, MinedBlock, PendingBlock};
pub use merkle::{build_tree, MerkleProof, MerkleTree, ProofNode, SiblingPosition, SENTINEL_HASH};
pub use miner::{meets_difficulty, DifficultyMiner, MiningOutcome};
pub use state_hasher::{account_root, hash_accounts, hash_tokens, token_root};
