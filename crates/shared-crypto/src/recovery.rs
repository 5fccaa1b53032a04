//! # Signature Recovery
//!
//! Recovers the signer address of a `SignedTransaction` and checks block
//! header signatures against the validator key.
//!
//! ## Security Notes
//!
//! - R and S must be in [1, n-1]
//! - S must be strictly below n/2 (no malleable twins)
//! - v is accepted as 0/1 or the legacy 27/28
//! - Range checks use `subtle` so timing does not depend on the scalar

use crate::ecdsa::address_from_verifying_key;
use crate::errors::SignatureError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use shared_types::{Address, BlockData, Hash, SignedTransaction, U256};
use subtle::{Choice, ConstantTimeEq};

/// secp256k1 curve order n
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// n/2, the malleability bound for S.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Recover the address that signed `signed.transaction`.
pub fn recover_signer(signed: &SignedTransaction) -> Result<Address, SignatureError> {
    let digest = signed.transaction.signing_hash()?;
    let v = u256_to_recovery_byte(&signed.v)?;
    let r = u256_to_bytes(&signed.r);
    let s = u256_to_bytes(&signed.s);
    recover_address(&digest, &r, &s, v)
}

/// Recover the signer and require it to equal `transaction.from`.
pub fn verify_signature(signed: &SignedTransaction) -> Result<Address, SignatureError> {
    let recovered = recover_signer(signed)?;
    let expected = signed.transaction.from;
    if recovered != expected {
        return Err(SignatureError::SignerMismatch {
            expected,
            actual: recovered,
        });
    }
    Ok(recovered)
}

/// Recover an address from a digest and raw signature components.
pub fn recover_address(
    digest: &Hash,
    r: &[u8; 32],
    s: &[u8; 32],
    v: u8,
) -> Result<Address, SignatureError> {
    if !is_valid_scalar(r) || !is_valid_scalar(s) {
        return Err(SignatureError::InvalidFormat);
    }
    if !is_low_s(s) {
        return Err(SignatureError::MalleableSignature);
    }
    let recovery_id = parse_recovery_id(v)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(r);
    sig_bytes[32..].copy_from_slice(s);
    let signature = Signature::from_slice(&sig_bytes).map_err(|_| SignatureError::InvalidFormat)?;

    let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_from_verifying_key(&key))
}

/// Check a 65-byte `r || s || v` header signature against a SEC1 public key.
pub fn verify_header_signature(
    header_hash: &Hash,
    signature: &[u8],
    public_key: &[u8],
) -> Result<(), SignatureError> {
    if signature.len() != 65 {
        return Err(SignatureError::InvalidFormat);
    }
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&signature[..32]);
    s.copy_from_slice(&signature[32..64]);

    let expected_key =
        VerifyingKey::from_sec1_bytes(public_key).map_err(|_| SignatureError::InvalidFormat)?;
    let expected = address_from_verifying_key(&expected_key);
    let actual = recover_address(header_hash, &r, &s, signature[64])?;
    if actual != expected {
        return Err(SignatureError::SignerMismatch { expected, actual });
    }
    Ok(())
}

/// Check a persisted block's header signature against its validator.
pub fn verify_block_signature(block: &BlockData) -> Result<(), SignatureError> {
    let header_hash = block.header.hash()?;
    verify_header_signature(&header_hash, &block.header_signature, &block.validator.public_key)
}

fn u256_to_bytes(value: &U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

fn u256_to_recovery_byte(v: &U256) -> Result<u8, SignatureError> {
    if *v > U256::from(u8::MAX) {
        return Err(SignatureError::InvalidRecoveryId(v.to_string()));
    }
    Ok(v.low_u32() as u8)
}

/// Valid v values: 0, 1, 27, 28
fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v.to_string())),
    };
    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(v.to_string()))
}

/// Constant-time `value < bound` over big-endian bytes.
fn ct_less_than(value: &[u8; 32], bound: &[u8; 32]) -> Choice {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let not_decided = !(less | greater);
        let byte_less = Choice::from((value[i] < bound[i]) as u8);
        let byte_greater = Choice::from((value[i] > bound[i]) as u8);

        less |= not_decided & byte_less;
        greater |= not_decided & byte_greater;
    }
    less
}

/// S strictly below half the curve order.
fn is_low_s(s: &[u8; 32]) -> bool {
    ct_less_than(s, &SECP256K1_HALF_ORDER).into()
}

/// Scalar in [1, n-1].
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for &byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }
    (!is_zero & ct_less_than(scalar, &SECP256K1_ORDER)).into()
}
