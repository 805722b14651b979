//! mirrorkv Storage - Store Capability Traits
//!
//! Defines the narrow capability contracts the mirror depends on:
//! [`DocumentStore`] for the authoritative store and [`CacheStore`] for the
//! volatile mirror. Network drivers bind to these traits through adapters;
//! this crate ships in-memory implementations and a hash-distributed cache
//! cluster built on top of any `CacheStore`.

pub mod cluster;
pub mod connector;
pub mod memory;

pub use cluster::HashedCacheStore;
pub use connector::{MemoryConnector, StoreConnector};
pub use memory::{MemoryCacheStore, MemoryDocumentStore};

use async_trait::async_trait;
use mirrorkv_core::{
    CasOutcome, Expiry, MultiGet, StoreKey, StoreResult, StoredValue, VersionToken,
    Versioned,
};
use std::collections::HashMap;

// ============================================================================
// DOCUMENT STORE
// ============================================================================

/// Authoritative store with typed per-key errors and version tokens.
///
/// Error contract:
/// - `insert` fails with `StoreError::AlreadyExists` if the key is present
/// - `replace`, `remove`, `counter` and `touch` fail with
///   `StoreError::NotFound` if the key is absent
/// - `replace_versioned` fails with `StoreError::VersionConflict` on a
///   token mismatch
/// - `append`/`prepend` fail with `StoreError::NotStored` if the key is absent
/// - transport failures surface as `StoreError::Unavailable`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a value and its version token, or None if absent.
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Versioned>>;

    /// Get several values. Absent keys are listed in `missing`.
    async fn get_multi(&self, keys: &[StoreKey]) -> StoreResult<MultiGet>;

    /// Store a value unconditionally.
    async fn upsert(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> StoreResult<VersionToken>;

    /// Store several values unconditionally.
    async fn upsert_multi(
        &self,
        items: &[(StoreKey, StoredValue)],
        expiry: Expiry,
    ) -> StoreResult<()> {
        for (key, value) in items {
            self.upsert(key, value, expiry).await?;
        }
        Ok(())
    }

    /// Store a value only if the key is absent.
    async fn insert(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> StoreResult<VersionToken>;

    /// Store a value only if the key is present.
    async fn replace(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> StoreResult<VersionToken>;

    /// Store a value only if the key's current token equals `version`.
    async fn replace_versioned(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        version: VersionToken,
        expiry: Expiry,
    ) -> StoreResult<VersionToken>;

    /// Remove a key.
    async fn remove(&self, key: &StoreKey) -> StoreResult<()>;

    /// Remove several keys.
    ///
    /// Every key is attempted; the first `NotFound` is reported after all
    /// removals ran. Any other error stops the batch.
    async fn remove_multi(&self, keys: &[StoreKey]) -> StoreResult<()> {
        let mut first_missing = None;
        for key in keys {
            match self.remove(key).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    first_missing.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        first_missing.map_or(Ok(()), Err)
    }

    /// Adjust a decimal counter by `delta`, returning the new value.
    /// Counters never go below zero.
    async fn counter(&self, key: &StoreKey, delta: i64) -> StoreResult<u64>;

    /// Reset a key's expiration.
    async fn touch(&self, key: &StoreKey, expiry: Expiry) -> StoreResult<()>;

    /// Append UTF-8 text to an existing value.
    async fn append(&self, key: &StoreKey, text: &str) -> StoreResult<()>;

    /// Prepend UTF-8 text to an existing value.
    async fn prepend(&self, key: &StoreKey, text: &str) -> StoreResult<()>;
}

// ============================================================================
// CACHE STORE
// ============================================================================

/// Volatile mirror store with memcached-style boolean results.
///
/// Per-key conditions (absent key, existing key, token mismatch) are
/// reported through the return value, never as errors. Errors are reserved
/// for transport failures (`StoreError::Unavailable`) and malformed
/// requests (`StoreError::Rejected`).
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<StoredValue>>;

    /// Get several values. Only found keys appear in the result.
    async fn get_many(&self, keys: &[StoreKey]) -> StoreResult<HashMap<StoreKey, StoredValue>>;

    /// Get a value with the cache's own CAS token.
    async fn gets(&self, key: &StoreKey) -> StoreResult<Option<Versioned>>;

    async fn gets_many(&self, keys: &[StoreKey]) -> StoreResult<HashMap<StoreKey, Versioned>>;

    async fn set(&self, key: &StoreKey, value: &StoredValue, expiry: Expiry) -> StoreResult<bool>;

    /// Store several values. True only if every item was stored.
    async fn set_many(
        &self,
        items: &[(StoreKey, StoredValue)],
        expiry: Expiry,
    ) -> StoreResult<bool> {
        let mut all = true;
        for (key, value) in items {
            all &= self.set(key, value, expiry).await?;
        }
        Ok(all)
    }

    async fn add(&self, key: &StoreKey, value: &StoredValue, expiry: Expiry) -> StoreResult<bool>;

    async fn replace(&self, key: &StoreKey, value: &StoredValue, expiry: Expiry)
        -> StoreResult<bool>;

    async fn delete(&self, key: &StoreKey) -> StoreResult<bool>;

    /// Delete several keys. Every key is attempted; true only if all existed.
    async fn delete_many(&self, keys: &[StoreKey]) -> StoreResult<bool> {
        let mut all = true;
        for key in keys {
            all &= self.delete(key).await?;
        }
        Ok(all)
    }

    /// Increment a decimal counter. None if the key is absent.
    async fn incr(&self, key: &StoreKey, delta: u64) -> StoreResult<Option<u64>>;

    /// Decrement a decimal counter, flooring at zero. None if the key is absent.
    async fn decr(&self, key: &StoreKey, delta: u64) -> StoreResult<Option<u64>>;

    async fn touch(&self, key: &StoreKey, expiry: Expiry) -> StoreResult<bool>;

    async fn append(&self, key: &StoreKey, value: &StoredValue) -> StoreResult<bool>;

    async fn prepend(&self, key: &StoreKey, value: &StoredValue) -> StoreResult<bool>;

    /// Store a value only if the cache's token for the key equals `version`.
    async fn cas(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        version: VersionToken,
        expiry: Expiry,
    ) -> StoreResult<CasOutcome>;
}
