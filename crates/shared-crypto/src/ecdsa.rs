//! # ECDSA Signing (secp256k1)
//!
//! Key pairs for the authority and for account holders.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization; the recovery id is flipped along with S
//! - Signing keys are zeroized on drop by `k256`
//!
//! Transactions are signed over `Transaction::signing_hash()` and carry
//! `(v, r, s)`. Block headers are signed over the header hash and carry the
//! 65-byte `r || s || v` form.

use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use shared_types::{keccak256, Address, BlockHeader, Hash, SignedTransaction, Transaction, Validator, U256};
use std::fmt;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed SEC1 bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; 33] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 33,
            actual: bytes.len(),
        })?;
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Account address controlled by this key.
    pub fn address(&self) -> Result<Address, CryptoError> {
        let key = VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(address_from_verifying_key(&key))
    }
}

/// A recoverable signature split into its components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    /// R component (big-endian)
    pub r: [u8; 32],
    /// S component (big-endian, low half of the curve order)
    pub s: [u8; 32],
    /// Recovery id, 0 or 1
    pub v: u8,
}

impl RecoverableSignature {
    /// `r || s || v` wire form used for header signatures.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }
}

/// secp256k1 ECDSA keypair.
#[derive(Clone)]
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("address", &hex::encode(self.address()))
            .finish_non_exhaustive()
    }
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get secret key bytes (for keystore sealing).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Secp256k1PublicKey(bytes)
    }

    /// Account address controlled by this key.
    pub fn address(&self) -> Address {
        address_from_verifying_key(self.signing_key.verifying_key())
    }

    /// Validator identity for this key.
    pub fn validator(&self, id: impl Into<String>) -> Validator {
        Validator {
            id: id.into(),
            public_key: self.public_key().as_bytes().to_vec(),
        }
    }

    /// Sign a 32-byte digest, returning a low-S recoverable signature.
    pub fn sign_prehash(&self, digest: &Hash) -> Result<RecoverableSignature, CryptoError> {
        let (signature, recovery_id): (Signature, RecoveryId) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            r,
            s,
            v: recovery_id.to_byte(),
        })
    }

    /// Sign a transaction intent.
    pub fn sign_transaction(&self, transaction: Transaction) -> Result<SignedTransaction, CryptoError> {
        let digest = transaction.signing_hash()?;
        let signature = self.sign_prehash(&digest)?;
        Ok(SignedTransaction {
            transaction,
            v: U256::from(signature.v),
            r: U256::from_big_endian(&signature.r),
            s: U256::from_big_endian(&signature.s),
        })
    }

    /// Sign a block header, returning `r || s || v`.
    pub fn sign_header(&self, header: &BlockHeader) -> Result<Vec<u8>, CryptoError> {
        let digest = header.hash()?;
        Ok(self.sign_prehash(&digest)?.to_bytes().to_vec())
    }
}

/// Address of a verifying key: last 20 bytes of keccak-256 over the
/// uncompressed point without its 0x04 prefix.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Address of a SEC1-encoded public key (compressed or uncompressed).
pub fn address_from_public_key(public_key: &[u8]) -> Result<Address, CryptoError> {
    let key = VerifyingKey::from_sec1_bytes(public_key).map_err(|_| CryptoError::InvalidPublicKey)?;
    Ok(address_from_verifying_key(&key))
}

/// Address of a validator's signing key.
pub fn validator_address(validator: &Validator) -> Result<Address, CryptoError> {
    address_from_public_key(&validator.public_key)
}
