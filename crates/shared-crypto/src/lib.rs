//! # Shared Crypto - Keys and Signatures for PoA-Chain
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `ecdsa` | secp256k1 | Transaction and header signing |
//! | `recovery` | secp256k1 recovery | Signer recovery, header checks |
//! | `symmetric` | XChaCha20-Poly1305, Argon2id KDF | Keystore sealing |
//! | `keystore` | - | `KeyProvider` backends |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic, low-S normalization
//! - **Recovery**: scalar range, low-S and recovery id checked before use
//! - **XChaCha20**: 192-bit random nonce per sealed file

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod keystore;
pub mod recovery;
pub mod symmetric;

// Re-exports
pub use ecdsa::{
    address_from_public_key, address_from_verifying_key, validator_address, RecoverableSignature,
    Secp256k1KeyPair, Secp256k1PublicKey,
};
pub use errors::{CryptoError, SignatureError};
pub use keystore::{FileKeyProvider, InMemoryKeyring, KeyProvider, KeystoreFile};
pub use recovery::{
    recover_address, recover_signer, verify_block_signature, verify_header_signature,
    verify_signature,
};
pub use symmetric::{decrypt, encrypt, KdfParams, Nonce, SecretKey};
