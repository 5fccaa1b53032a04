//! Serde adapters for storage-boundary encodings.

use primitive_types::U256;
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

/// `U256` as a base-10 string.
///
/// `U256`'s own `FromStr` parses hex, so `DisplayFromStr` would not
/// round-trip; this adapter pins both directions to decimal.
pub struct Decimal;

impl SerializeAs<U256> for Decimal {
    fn serialize_as<S>(source: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&source.to_string())
    }
}

impl<'de> DeserializeAs<'de, U256> for Decimal {
    fn deserialize_as<D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        U256::from_dec_str(&raw).map_err(|e| D::Error::custom(format!("invalid decimal {raw:?}: {e:?}")))
    }
}
