//! Crypto error types.

use shared_types::{Address, CodecError};
use thiserror::Error;

/// Key handling and keystore errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (wrong password or tampered keystore)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// No key is held for the address
    #[error("No key for address 0x{}", hex::encode(.0))]
    KeyNotFound(Address),

    /// Password key derivation rejected its parameters
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Keystore file could not be read, written or parsed
    #[error("Keystore error: {0}")]
    Keystore(String),

    /// Keystore decrypted to a key for a different address
    #[error("Keystore address mismatch: file 0x{}, key 0x{}", hex::encode(.expected), hex::encode(.actual))]
    AddressMismatch {
        /// Address recorded in the keystore
        expected: Address,
        /// Address derived from the decrypted key
        actual: Address,
    },

    /// Canonical encoding failed
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors from verifying or recovering a transaction or header signature.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature format is invalid (wrong length, zero or out-of-range scalar)
    #[error("Invalid signature format")]
    InvalidFormat,

    /// Signature has high S value
    #[error("Malleable signature (high S value)")]
    MalleableSignature,

    /// Invalid recovery ID (v must be 0, 1, 27, or 28)
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(String),

    /// Failed to recover public key from signature
    #[error("Failed to recover public key")]
    RecoveryFailed,

    /// Recovered signer does not match expected signer
    #[error("Signer mismatch: expected 0x{}, got 0x{}", hex::encode(.expected), hex::encode(.actual))]
    SignerMismatch {
        /// Address the signature claims
        expected: Address,
        /// Address actually recovered
        actual: Address,
    },

    /// Payload could not be encoded for hashing
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl From<CodecError> for SignatureError {
    fn from(err: CodecError) -> Self {
        SignatureError::Encoding(err.to_string())
    }
}
