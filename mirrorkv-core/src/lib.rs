//! mirrorkv Core - Data Model
//!
//! Pure data structures shared by the store adapters and the mirror
//! coordinator. This crate contains no I/O.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod outcome;

pub use config::{CacheNode, MirrorConfig};
pub use error::{ConfigError, MirrorError, MirrorResult, StoreError, StoreResult};
pub use outcome::Outcome;

// ============================================================================
// KEYS AND VALUES
// ============================================================================

/// Key addressing one logical item in both stores.
///
/// The coordinator never remaps keys: the same string is sent to the
/// document store and to the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for StoreKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StoreKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StoreKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for StoreKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Opaque payload written identically to both stores.
///
/// Stores treat the bytes as opaque except for counters (decimal text) and
/// the document-store leg of append/prepend (UTF-8 text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredValue(Vec<u8>);

impl StoredValue {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into().into_bytes())
    }

    /// Serialize any value as a JSON payload.
    pub fn to_json<T: Serialize>(value: &T) -> MirrorResult<Self> {
        Ok(Self(serde_json::to_vec(value)?))
    }

    /// Decode a JSON payload written by [`StoredValue::to_json`].
    pub fn decode<T: DeserializeOwned>(&self) -> MirrorResult<T> {
        Ok(serde_json::from_slice(&self.0)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The payload as UTF-8 text, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// An empty payload counts as a miss on the fallback read path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for StoredValue {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Per-store concurrency token. Tokens from the two stores are never
/// comparable; only the primary store's tokens are surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(u64);

impl VersionToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A value together with the version token of the store that returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    pub value: StoredValue,
    pub version: VersionToken,
}

impl Versioned {
    pub fn new(value: StoredValue, version: VersionToken) -> Self {
        Self { value, version }
    }
}

/// Item expiration. `Never` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Expiry {
    #[default]
    Never,
    After(Duration),
}

impl Expiry {
    /// Expiry in whole seconds; zero means the item never expires.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Expiry::Never
        } else {
            Expiry::After(Duration::from_secs(secs))
        }
    }

    pub fn duration(self) -> Option<Duration> {
        match self {
            Expiry::Never => None,
            Expiry::After(duration) => Some(duration),
        }
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Expiry::Never
        } else {
            Expiry::After(duration)
        }
    }
}

// ============================================================================
// STORE DESIGNATION
// ============================================================================

/// Which backing store an error or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Document,
    Cache,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Document => f.write_str("document"),
            StoreKind::Cache => f.write_str("cache"),
        }
    }
}

/// The authoritative store. Fixed when the mirror is constructed; decides
/// read order and whose version tokens govern CAS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primary {
    #[default]
    Document,
    Cache,
}

impl Primary {
    pub fn store(self) -> StoreKind {
        match self {
            Primary::Document => StoreKind::Document,
            Primary::Cache => StoreKind::Cache,
        }
    }

    pub fn secondary(self) -> StoreKind {
        match self {
            Primary::Document => StoreKind::Cache,
            Primary::Cache => StoreKind::Document,
        }
    }
}

impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.store(), f)
    }
}

impl FromStr for Primary {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" | "couchbase" => Ok(Primary::Document),
            "cache" | "memcached" => Ok(Primary::Cache),
            other => Err(ConfigError::InvalidValue {
                field: "primary".to_string(),
                value: other.to_string(),
                reason: "expected one of: document, cache".to_string(),
            }),
        }
    }
}

// ============================================================================
// OPERATION RESULTS
// ============================================================================

/// Result of a document-store multi-get: found entries plus the keys the
/// store reported missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiGet {
    pub found: HashMap<StoreKey, Versioned>,
    pub missing: Vec<StoreKey>,
}

/// Result of a conditional replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CasOutcome {
    /// The token matched and the new value was stored.
    Applied,
    /// The item changed since the token was read.
    Conflict,
    /// No item exists under the key.
    Absent,
}

impl CasOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, CasOutcome::Applied)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        entry: String,
        updated: u64,
    }

    #[test]
    fn test_stored_value_json_roundtrip() {
        let entry = Entry {
            entry: "Mirror value".to_string(),
            updated: 1_700_000_000,
        };
        let value = StoredValue::to_json(&entry).unwrap();
        assert_eq!(value.decode::<Entry>().unwrap(), entry);
    }

    #[test]
    fn test_stored_value_decode_garbage_is_codec_error() {
        let value = StoredValue::from_bytes(vec![0xff, 0x00]);
        assert!(matches!(
            value.decode::<Entry>(),
            Err(MirrorError::Codec { .. })
        ));
        assert!(value.as_text().is_none());
    }

    #[test]
    fn test_expiry_zero_means_never() {
        assert_eq!(Expiry::from_secs(0), Expiry::Never);
        assert_eq!(Expiry::from(Duration::ZERO), Expiry::Never);
        assert_eq!(
            Expiry::from_secs(60).duration(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(Expiry::default(), Expiry::Never);
    }

    #[test]
    fn test_primary_parse() {
        assert_eq!("document".parse::<Primary>().unwrap(), Primary::Document);
        assert_eq!("Couchbase".parse::<Primary>().unwrap(), Primary::Document);
        assert_eq!(" cache ".parse::<Primary>().unwrap(), Primary::Cache);
        assert_eq!("MEMCACHED".parse::<Primary>().unwrap(), Primary::Cache);
        assert!(matches!(
            "redis".parse::<Primary>(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "primary"
        ));
    }

    #[test]
    fn test_primary_secondary() {
        assert_eq!(Primary::Document.secondary(), StoreKind::Cache);
        assert_eq!(Primary::Cache.secondary(), StoreKind::Document);
        assert_eq!(Primary::default(), Primary::Document);
    }

    #[test]
    fn test_store_key_borrow_lookup() {
        let mut map = HashMap::new();
        map.insert(StoreKey::from("mirrkey"), 1);
        assert_eq!(map.get("mirrkey"), Some(&1));
    }
}
