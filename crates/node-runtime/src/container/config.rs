//! # Node Configuration
//!
//! Defaults overridden by `POA_*` environment variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `POA_CHAIN_ID` | `consensus.chain_id` |
//! | `POA_DIFFICULTY` | `consensus.mining.difficulty` |
//! | `POA_MINING_REWARD` | `consensus.mining.mining_reward` |
//! | `POA_HALT_ON_INVALID_TX` | `consensus.halt_on_validation_error` |
//! | `POA_MINING_TIMEOUT_MS` | `consensus.mining_timeout_ms` |
//! | `POA_RETRY_BACKOFF_MS` | `consensus.retry_backoff_ms` |
//! | `POA_KEYSTORE_DIR` | `keystore.dir` |
//! | `POA_KEY_PASSWORD` | `keystore.password` |
//! | `POA_AUTHORITY_ADDRESS` | `keystore.authority_address` |
//! | `POA_KDF_MEMORY_KIB` | `keystore.kdf.m_cost` |
//! | `POA_GENESIS_BALANCE` | `genesis.authority_balance` |
//!
//! ## Security Requirements
//!
//! - The keystore password MUST be set; there is no default
//! - The password never appears in `Debug` output

use pc_08_consensus::ConsensusConfig;
use pc_17_block_production::MAX_DIFFICULTY;
use serde::Deserialize;
use shared_crypto::KdfParams;
use shared_types::Address;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Consensus cycle and mining.
    pub consensus: ConsensusConfig,
    /// Authority key location.
    pub keystore: KeystoreConfig,
    /// Initial chain allocation.
    pub genesis: GenesisConfig,
}

impl NodeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `POA_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("POA_CHAIN_ID") {
            config.consensus.chain_id = parse("POA_CHAIN_ID", &v)?;
        }
        if let Some(v) = lookup("POA_DIFFICULTY") {
            config.consensus.mining.difficulty = parse("POA_DIFFICULTY", &v)?;
        }
        if let Some(v) = lookup("POA_MINING_REWARD") {
            config.consensus.mining.mining_reward = parse("POA_MINING_REWARD", &v)?;
        }
        if let Some(v) = lookup("POA_HALT_ON_INVALID_TX") {
            config.consensus.halt_on_validation_error = parse("POA_HALT_ON_INVALID_TX", &v)?;
        }
        if let Some(v) = lookup("POA_MINING_TIMEOUT_MS") {
            config.consensus.mining_timeout_ms = parse("POA_MINING_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("POA_RETRY_BACKOFF_MS") {
            config.consensus.retry_backoff_ms = parse("POA_RETRY_BACKOFF_MS", &v)?;
        }
        if let Some(v) = lookup("POA_KEYSTORE_DIR") {
            config.keystore.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("POA_KEY_PASSWORD") {
            config.keystore.password = Some(v);
        }
        if let Some(v) = lookup("POA_AUTHORITY_ADDRESS") {
            config.keystore.authority_address = Some(parse_address("POA_AUTHORITY_ADDRESS", &v)?);
        }
        if let Some(v) = lookup("POA_KDF_MEMORY_KIB") {
            config.keystore.kdf.m_cost = parse("POA_KDF_MEMORY_KIB", &v)?;
        }
        if let Some(v) = lookup("POA_GENESIS_BALANCE") {
            config.genesis.authority_balance = parse("POA_GENESIS_BALANCE", &v)?;
        }

        Ok(config)
    }

    /// Reject configurations the node must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.keystore.password.as_deref() {
            None | Some("") => return Err(ConfigError::MissingKeyPassword),
            Some(_) => {}
        }
        let difficulty = self.consensus.mining.difficulty;
        if difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::DifficultyTooHigh(difficulty));
        }
        self.consensus
            .validate()
            .map_err(|e| ConfigError::Consensus(e.to_string()))
    }
}

/// Where the authority key lives.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct KeystoreConfig {
    /// Directory of `<address>.json` keystore files.
    pub dir: PathBuf,
    /// Password unsealing every keystore in `dir`.
    pub password: Option<String>,
    /// Authority address; a fresh key is generated into `dir` when unset.
    pub authority_address: Option<Address>,
    /// Argon2id cost for newly sealed keys.
    pub kdf: KdfParams,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./keystore"),
            password: None,
            authority_address: None,
            kdf: KdfParams::default(),
        }
    }
}

impl fmt::Debug for KeystoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoreConfig")
            .field("dir", &self.dir)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "authority_address",
                &self.authority_address.map(|a| format!("0x{}", hex::encode(a))),
            )
            .field("kdf", &self.kdf)
            .finish()
    }
}

/// Genesis allocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Coins credited to the authority in block 0.
    pub authority_balance: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            authority_balance: 1_000_000,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
    /// Keystore password not set.
    MissingKeyPassword,
    /// Difficulty above the hex digits of a 32-byte hash.
    DifficultyTooHigh(u16),
    /// Consensus settings rejected.
    Consensus(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
            ConfigError::MissingKeyPassword => write!(
                f,
                "Keystore password is not set. Set POA_KEY_PASSWORD environment variable."
            ),
            ConfigError::DifficultyTooHigh(d) => {
                write!(f, "Difficulty {} exceeds maximum {}", d, MAX_DIFFICULTY)
            }
            ConfigError::Consensus(msg) => write!(f, "Invalid consensus config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_address(key: &'static str, value: &str) -> Result<Address, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    };
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| invalid())?;
    bytes.try_into().map_err(|_| invalid())
}
