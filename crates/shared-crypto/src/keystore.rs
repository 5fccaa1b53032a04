//! # Keystore
//!
//! Signing keys live on disk as password-sealed JSON files named
//! `<hex address>.json`. The chain core never touches files directly: it
//! asks a [`KeyProvider`] for the key of an address.
//!
//! [`FileKeyProvider`] unseals each key once and keeps it in memory for
//! the life of the provider.

use crate::ecdsa::Secp256k1KeyPair;
use crate::symmetric::{decrypt, encrypt, KdfParams, Nonce, SecretKey};
use crate::CryptoError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::Address;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// Current keystore file format.
pub const KEYSTORE_VERSION: u32 = 2;

const SALT_LEN: usize = 16;

/// Source of signing keys by address.
pub trait KeyProvider: Send + Sync {
    /// Signing key for `address`.
    fn key_for(&self, address: &Address) -> Result<Secp256k1KeyPair, CryptoError>;
}

/// A sealed signing key as stored on disk.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreFile {
    /// Format version.
    pub version: u32,
    /// Address of the sealed key.
    #[serde_as(as = "Hex")]
    pub address: Address,
    /// Argon2id cost the key was sealed with.
    pub kdf: KdfParams,
    /// Key-derivation salt.
    #[serde_as(as = "Hex")]
    pub salt: Vec<u8>,
    /// XChaCha20 nonce.
    #[serde_as(as = "Hex")]
    pub nonce: [u8; 24],
    /// Sealed 32-byte secret.
    #[serde_as(as = "Hex")]
    pub ciphertext: Vec<u8>,
}

impl KeystoreFile {
    /// Seal `keypair` under `password` with the default KDF cost.
    pub fn seal(keypair: &Secp256k1KeyPair, password: &str) -> Result<Self, CryptoError> {
        Self::seal_with(keypair, password, KdfParams::default())
    }

    /// Seal `keypair` under `password` with an explicit KDF cost.
    pub fn seal_with(
        keypair: &Secp256k1KeyPair,
        password: &str,
        kdf: KdfParams,
    ) -> Result<Self, CryptoError> {
        let mut salt = vec![0u8; SALT_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);

        let key = SecretKey::derive(password.as_bytes(), &salt, &kdf)?;
        let secret = Zeroizing::new(keypair.to_bytes());
        let (ciphertext, nonce) = encrypt(&key, &secret[..])?;

        Ok(Self {
            version: KEYSTORE_VERSION,
            address: keypair.address(),
            kdf,
            salt,
            nonce: *nonce.as_bytes(),
            ciphertext,
        })
    }

    /// Unseal with `password`, checking the key matches the recorded address.
    pub fn open(&self, password: &str) -> Result<Secp256k1KeyPair, CryptoError> {
        if self.version != KEYSTORE_VERSION {
            return Err(CryptoError::Keystore(format!(
                "unsupported keystore version {}",
                self.version
            )));
        }
        let key = SecretKey::derive(password.as_bytes(), &self.salt, &self.kdf)?;
        let plaintext = Zeroizing::new(decrypt(&key, &self.ciphertext, &Nonce::from_bytes(self.nonce))?);
        let secret: [u8; 32] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: plaintext.len(),
            })?;
        let secret = Zeroizing::new(secret);

        let keypair = Secp256k1KeyPair::from_bytes(*secret)?;
        let actual = keypair.address();
        if actual != self.address {
            return Err(CryptoError::AddressMismatch {
                expected: self.address,
                actual,
            });
        }
        Ok(keypair)
    }

    /// File name for `address` inside a keystore directory.
    pub fn file_name(address: &Address) -> String {
        format!("{}.json", hex::encode(address))
    }

    /// Write as JSON into `dir`, returning the file path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, CryptoError> {
        std::fs::create_dir_all(dir).map_err(|e| CryptoError::Keystore(e.to_string()))?;
        let path = dir.join(Self::file_name(&self.address));
        let json = serde_json::to_vec_pretty(self).map_err(|e| CryptoError::Keystore(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| CryptoError::Keystore(e.to_string()))?;
        Ok(path)
    }

    /// Read a keystore JSON file.
    pub fn read_from(path: &Path) -> Result<Self, CryptoError> {
        let raw = std::fs::read(path)
            .map_err(|e| CryptoError::Keystore(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&raw).map_err(|e| CryptoError::Keystore(format!("{}: {e}", path.display())))
    }
}

/// Keys loaded from a directory of sealed keystore files.
pub struct FileKeyProvider {
    dir: PathBuf,
    password: Zeroizing<String>,
    kdf: KdfParams,
    unsealed: RwLock<HashMap<Address, Secp256k1KeyPair>>,
}

impl FileKeyProvider {
    /// Provider over `dir`, unsealing with `password`.
    pub fn new(dir: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            password: Zeroizing::new(password.into()),
            kdf: KdfParams::default(),
            unsealed: RwLock::new(HashMap::new()),
        }
    }

    /// KDF cost for keys sealed by [`Self::import`]. Existing files keep
    /// the cost recorded in them.
    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Seal and store a new key, returning its address.
    pub fn import(&self, keypair: &Secp256k1KeyPair) -> Result<Address, CryptoError> {
        let file = KeystoreFile::seal_with(keypair, &self.password, self.kdf)?;
        let path = file.write_to(&self.dir)?;
        debug!(path = %path.display(), "Keystore written");
        self.unsealed.write().insert(file.address, keypair.clone());
        Ok(file.address)
    }

    /// Number of keys held unsealed.
    pub fn unsealed_count(&self) -> usize {
        self.unsealed.read().len()
    }
}

impl KeyProvider for FileKeyProvider {
    fn key_for(&self, address: &Address) -> Result<Secp256k1KeyPair, CryptoError> {
        if let Some(keypair) = self.unsealed.read().get(address) {
            return Ok(keypair.clone());
        }

        let path = self.dir.join(KeystoreFile::file_name(address));
        if !path.exists() {
            return Err(CryptoError::KeyNotFound(*address));
        }
        let keypair = KeystoreFile::read_from(&path)?.open(&self.password)?;
        debug!(address = %hex::encode(address), "Keystore unsealed");
        self.unsealed.write().insert(*address, keypair.clone());
        Ok(keypair)
    }
}

/// Unsealed keys held in memory.
#[derive(Default)]
pub struct InMemoryKeyring {
    keys: RwLock<HashMap<Address, Secp256k1KeyPair>>,
}

impl InMemoryKeyring {
    /// Empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, returning its address.
    pub fn insert(&self, keypair: Secp256k1KeyPair) -> Address {
        let address = keypair.address();
        self.keys.write().insert(address, keypair);
        address
    }

    /// Generate and add a fresh key.
    pub fn generate(&self) -> Secp256k1KeyPair {
        let keypair = Secp256k1KeyPair::generate();
        self.insert(keypair.clone());
        keypair
    }
}

impl KeyProvider for InMemoryKeyring {
    fn key_for(&self, address: &Address) -> Result<Secp256k1KeyPair, CryptoError> {
        self.keys
            .read()
            .get(address)
            .cloned()
            .ok_or(CryptoError::KeyNotFound(*address))
    }
}
