//! In-memory store implementations.
//!
//! [`MemoryDocumentStore`] and [`MemoryCacheStore`] follow the error
//! contracts of their traits exactly and are used by tests and by
//! [`crate::MemoryConnector`]. Both are cheap handles: clones share state.
//!
//! Expiry is evaluated lazily against `tokio::time::Instant`, so tests can
//! pause and advance time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mirrorkv_core::{
    CasOutcome, Expiry, MultiGet, StoreError, StoreKey, StoreKind, StoreResult, StoredValue,
    VersionToken, Versioned,
};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{CacheStore, DocumentStore};

const NON_NUMERIC: &str = "cannot increment or decrement non-numeric value";

// ============================================================================
// SHARED TABLE
// ============================================================================

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    version: VersionToken,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    fn versioned(&self) -> Versioned {
        Versioned::new(self.value.clone(), self.version)
    }
}

fn deadline(expiry: Expiry) -> Option<Instant> {
    expiry.duration().map(|ttl| Instant::now() + ttl)
}

fn parse_counter(value: &StoredValue) -> Option<u64> {
    value.as_text().and_then(|text| text.trim().parse().ok())
}

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<StoreKey, Entry>,
    last_version: u64,
}

impl Table {
    fn next_version(&mut self) -> VersionToken {
        self.last_version += 1;
        VersionToken::new(self.last_version)
    }

    fn live(&self, key: &StoreKey) -> Option<&Entry> {
        let now = Instant::now();
        self.entries.get(key).filter(|entry| entry.is_live(now))
    }

    /// Live entry for mutation; expired entries are purged first.
    fn live_mut(&mut self, key: &StoreKey) -> Option<&mut Entry> {
        let now = Instant::now();
        let expired = self.entries.get(key).is_some_and(|e| !e.is_live(now));
        if expired {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn store(&mut self, key: &StoreKey, value: &StoredValue, expiry: Expiry) -> VersionToken {
        let version = self.next_version();
        self.entries.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                version,
                expires_at: deadline(expiry),
            },
        );
        version
    }

    /// Modify a live entry in place and give it a new version.
    fn rewrite<F>(&mut self, key: &StoreKey, f: F) -> Option<VersionToken>
    where
        F: FnOnce(&mut Entry),
    {
        self.live_mut(key)?;
        let version = self.next_version();
        let entry = self.entries.get_mut(key)?;
        f(entry);
        entry.version = version;
        Some(version)
    }

    fn remove(&mut self, key: &StoreKey) -> bool {
        self.live_mut(key).is_some() && self.entries.remove(key).is_some()
    }

    /// None if absent, Some(Err) if the stored value is not a counter.
    fn adjust_counter(&mut self, key: &StoreKey, delta: i64) -> Option<Result<u64, String>> {
        let current = match parse_counter(&self.live_mut(key)?.value) {
            Some(current) => current,
            None => return Some(Err(NON_NUMERIC.to_string())),
        };
        let next = if delta >= 0 {
            current.saturating_add(delta.unsigned_abs())
        } else {
            current.saturating_sub(delta.unsigned_abs())
        };
        self.rewrite(key, |entry| entry.value = StoredValue::from_text(next.to_string()));
        Some(Ok(next))
    }

    fn splice(&mut self, key: &StoreKey, bytes: &[u8], at_end: bool) -> bool {
        self.rewrite(key, |entry| {
            let mut joined = Vec::with_capacity(entry.value.len() + bytes.len());
            if at_end {
                joined.extend_from_slice(entry.value.as_bytes());
                joined.extend_from_slice(bytes);
            } else {
                joined.extend_from_slice(bytes);
                joined.extend_from_slice(entry.value.as_bytes());
            }
            entry.value = StoredValue::from_bytes(joined);
        })
        .is_some()
    }
}

/// State shared by all clones of one in-memory store.
#[derive(Debug, Clone)]
struct Shared {
    kind: StoreKind,
    table: Arc<RwLock<Table>>,
    available: Arc<AtomicBool>,
    calls: Arc<AtomicU64>,
    latency_ms: Arc<AtomicU64>,
}

impl Shared {
    fn new(kind: StoreKind) -> Self {
        Self {
            kind,
            table: Arc::new(RwLock::new(Table::default())),
            available: Arc::new(AtomicBool::new(true)),
            calls: Arc::new(AtomicU64::new(0)),
            latency_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Count the call, wait out the simulated latency, then fail the call
    /// if the store is marked unavailable.
    async fn admit(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::unavailable(self.kind, "connection refused"))
        }
    }

    async fn len(&self) -> usize {
        let table = self.table.read().await;
        let now = Instant::now();
        table.entries.values().filter(|e| e.is_live(now)).count()
    }

    async fn peek(&self, key: &StoreKey) -> Option<StoredValue> {
        self.table.read().await.live(key).map(|e| e.value.clone())
    }
}

macro_rules! memory_store_handle {
    ($name:ident) => {
        impl $name {
            /// Simulate a transport failure: while unavailable every call
            /// fails with [`StoreError::Unavailable`].
            pub fn set_available(&self, available: bool) {
                self.0.available.store(available, Ordering::Release);
            }

            /// Delay every call by `latency` before it touches the table.
            pub fn set_latency(&self, latency: Duration) {
                let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                self.0.latency_ms.store(millis, Ordering::Relaxed);
            }

            /// Number of trait calls received, including failed ones.
            pub fn calls(&self) -> u64 {
                self.0.calls.load(Ordering::Relaxed)
            }

            /// Number of live items.
            pub async fn len(&self) -> usize {
                self.0.len().await
            }

            pub async fn is_empty(&self) -> bool {
                self.0.len().await == 0
            }

            /// Read a live value without counting a call.
            pub async fn peek(&self, key: &StoreKey) -> Option<StoredValue> {
                self.0.peek(key).await
            }

            /// Drop all items.
            pub async fn clear(&self) {
                self.0.table.write().await.entries.clear();
            }
        }
    };
}

// ============================================================================
// DOCUMENT STORE
// ============================================================================

/// In-memory authoritative store.
#[derive(Debug, Clone)]
pub struct MemoryDocumentStore(Shared);

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self(Shared::new(StoreKind::Document))
    }
}

memory_store_handle!(MemoryDocumentStore);

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Versioned>> {
        self.0.admit().await?;
        Ok(self.0.table.read().await.live(key).map(Entry::versioned))
    }

    async fn get_multi(&self, keys: &[StoreKey]) -> StoreResult<MultiGet> {
        self.0.admit().await?;
        let table = self.0.table.read().await;
        let mut result = MultiGet::default();
        for key in keys {
            match table.live(key) {
                Some(entry) => {
                    result.found.insert(key.clone(), entry.versioned());
                }
                None => result.missing.push(key.clone()),
            }
        }
        Ok(result)
    }

    async fn upsert(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> StoreResult<VersionToken> {
        self.0.admit().await?;
        Ok(self.0.table.write().await.store(key, value, expiry))
    }

    async fn upsert_multi(
        &self,
        items: &[(StoreKey, StoredValue)],
        expiry: Expiry,
    ) -> StoreResult<()> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        for (key, value) in items {
            table.store(key, value, expiry);
        }
        Ok(())
    }

    async fn insert(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> StoreResult<VersionToken> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        if table.live_mut(key).is_some() {
            return Err(StoreError::AlreadyExists { key: key.clone() });
        }
        Ok(table.store(key, value, expiry))
    }

    async fn replace(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> StoreResult<VersionToken> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        if table.live_mut(key).is_none() {
            return Err(StoreError::not_found(key));
        }
        Ok(table.store(key, value, expiry))
    }

    async fn replace_versioned(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        version: VersionToken,
        expiry: Expiry,
    ) -> StoreResult<VersionToken> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        match table.live_mut(key).map(|entry| entry.version) {
            None => Err(StoreError::not_found(key)),
            Some(current) if current != version => {
                Err(StoreError::VersionConflict { key: key.clone() })
            }
            Some(_) => Ok(table.store(key, value, expiry)),
        }
    }

    async fn remove(&self, key: &StoreKey) -> StoreResult<()> {
        self.0.admit().await?;
        if self.0.table.write().await.remove(key) {
            Ok(())
        } else {
            Err(StoreError::not_found(key))
        }
    }

    async fn remove_multi(&self, keys: &[StoreKey]) -> StoreResult<()> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        let mut first_missing = None;
        for key in keys {
            if !table.remove(key) && first_missing.is_none() {
                first_missing = Some(StoreError::not_found(key));
            }
        }
        first_missing.map_or(Ok(()), Err)
    }

    async fn counter(&self, key: &StoreKey, delta: i64) -> StoreResult<u64> {
        self.0.admit().await?;
        match self.0.table.write().await.adjust_counter(key, delta) {
            None => Err(StoreError::not_found(key)),
            Some(Ok(value)) => Ok(value),
            Some(Err(reason)) => Err(StoreError::Rejected {
                key: key.clone(),
                reason,
            }),
        }
    }

    async fn touch(&self, key: &StoreKey, expiry: Expiry) -> StoreResult<()> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        let entry = table
            .live_mut(key)
            .ok_or_else(|| StoreError::not_found(key))?;
        entry.expires_at = deadline(expiry);
        Ok(())
    }

    async fn append(&self, key: &StoreKey, text: &str) -> StoreResult<()> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        if table.splice(key, text.as_bytes(), true) {
            Ok(())
        } else {
            Err(StoreError::NotStored { key: key.clone() })
        }
    }

    async fn prepend(&self, key: &StoreKey, text: &str) -> StoreResult<()> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        if table.splice(key, text.as_bytes(), false) {
            Ok(())
        } else {
            Err(StoreError::NotStored { key: key.clone() })
        }
    }
}

// ============================================================================
// CACHE STORE
// ============================================================================

/// In-memory volatile store with memcached semantics.
#[derive(Debug, Clone)]
pub struct MemoryCacheStore(Shared);

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self(Shared::new(StoreKind::Cache))
    }
}

memory_store_handle!(MemoryCacheStore);

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<StoredValue>> {
        self.0.admit().await?;
        Ok(self.0.table.read().await.live(key).map(|e| e.value.clone()))
    }

    async fn get_many(&self, keys: &[StoreKey]) -> StoreResult<HashMap<StoreKey, StoredValue>> {
        self.0.admit().await?;
        let table = self.0.table.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| table.live(key).map(|e| (key.clone(), e.value.clone())))
            .collect())
    }

    async fn gets(&self, key: &StoreKey) -> StoreResult<Option<Versioned>> {
        self.0.admit().await?;
        Ok(self.0.table.read().await.live(key).map(Entry::versioned))
    }

    async fn gets_many(&self, keys: &[StoreKey]) -> StoreResult<HashMap<StoreKey, Versioned>> {
        self.0.admit().await?;
        let table = self.0.table.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| table.live(key).map(|e| (key.clone(), e.versioned())))
            .collect())
    }

    async fn set(&self, key: &StoreKey, value: &StoredValue, expiry: Expiry) -> StoreResult<bool> {
        self.0.admit().await?;
        self.0.table.write().await.store(key, value, expiry);
        Ok(true)
    }

    async fn set_many(
        &self,
        items: &[(StoreKey, StoredValue)],
        expiry: Expiry,
    ) -> StoreResult<bool> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        for (key, value) in items {
            table.store(key, value, expiry);
        }
        Ok(true)
    }

    async fn add(&self, key: &StoreKey, value: &StoredValue, expiry: Expiry) -> StoreResult<bool> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        if table.live_mut(key).is_some() {
            return Ok(false);
        }
        table.store(key, value, expiry);
        Ok(true)
    }

    async fn replace(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> StoreResult<bool> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        if table.live_mut(key).is_none() {
            return Ok(false);
        }
        table.store(key, value, expiry);
        Ok(true)
    }

    async fn delete(&self, key: &StoreKey) -> StoreResult<bool> {
        self.0.admit().await?;
        Ok(self.0.table.write().await.remove(key))
    }

    async fn delete_many(&self, keys: &[StoreKey]) -> StoreResult<bool> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        let mut all = true;
        for key in keys {
            all &= table.remove(key);
        }
        Ok(all)
    }

    async fn incr(&self, key: &StoreKey, delta: u64) -> StoreResult<Option<u64>> {
        self.0.admit().await?;
        let delta = i64::try_from(delta).unwrap_or(i64::MAX);
        counter_result(key, self.0.table.write().await.adjust_counter(key, delta))
    }

    async fn decr(&self, key: &StoreKey, delta: u64) -> StoreResult<Option<u64>> {
        self.0.admit().await?;
        let delta = i64::try_from(delta).map_or(i64::MIN, |d| -d);
        counter_result(key, self.0.table.write().await.adjust_counter(key, delta))
    }

    async fn touch(&self, key: &StoreKey, expiry: Expiry) -> StoreResult<bool> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        Ok(match table.live_mut(key) {
            Some(entry) => {
                entry.expires_at = deadline(expiry);
                true
            }
            None => false,
        })
    }

    async fn append(&self, key: &StoreKey, value: &StoredValue) -> StoreResult<bool> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        Ok(table.splice(key, value.as_bytes(), true))
    }

    async fn prepend(&self, key: &StoreKey, value: &StoredValue) -> StoreResult<bool> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        Ok(table.splice(key, value.as_bytes(), false))
    }

    async fn cas(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        version: VersionToken,
        expiry: Expiry,
    ) -> StoreResult<CasOutcome> {
        self.0.admit().await?;
        let mut table = self.0.table.write().await;
        match table.live_mut(key).map(|entry| entry.version) {
            None => Ok(CasOutcome::Absent),
            Some(current) if current != version => Ok(CasOutcome::Conflict),
            Some(_) => {
                table.store(key, value, expiry);
                Ok(CasOutcome::Applied)
            }
        }
    }
}

fn counter_result(
    key: &StoreKey,
    adjusted: Option<Result<u64, String>>,
) -> StoreResult<Option<u64>> {
    match adjusted {
        None => Ok(None),
        Some(Ok(value)) => Ok(Some(value)),
        Some(Err(reason)) => Err(StoreError::Rejected {
            key: key.clone(),
            reason,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(k: &str) -> StoreKey {
        StoreKey::from(k)
    }

    #[tokio::test]
    async fn test_document_insert_conflict() {
        let store = MemoryDocumentStore::new();
        let v = StoredValue::from("v");
        store.insert(&key("a"), &v, Expiry::Never).await.unwrap();
        let err = store
            .insert(&key("a"), &v, Expiry::Never)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists { key: key("a") });
    }

    #[tokio::test]
    async fn test_document_replace_absent_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .replace(&key("a"), &StoredValue::from("v"), Expiry::Never)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_document_replace_versioned() {
        let store = MemoryDocumentStore::new();
        let v1 = store
            .upsert(&key("a"), &StoredValue::from("one"), Expiry::Never)
            .await
            .unwrap();
        let v2 = store
            .replace_versioned(&key("a"), &StoredValue::from("two"), v1, Expiry::Never)
            .await
            .unwrap();
        assert_ne!(v1, v2);

        let err = store
            .replace_versioned(&key("a"), &StoredValue::from("three"), v1, Expiry::Never)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::VersionConflict { key: key("a") });
        assert_eq!(store.peek(&key("a")).await, Some(StoredValue::from("two")));

        let err = store
            .replace_versioned(&key("b"), &StoredValue::from("x"), v2, Expiry::Never)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_document_get_multi_splits_missing() {
        let store = MemoryDocumentStore::new();
        store
            .upsert(&key("a"), &StoredValue::from("1"), Expiry::Never)
            .await
            .unwrap();
        let result = store.get_multi(&[key("a"), key("b")]).await.unwrap();
        assert_eq!(result.found.len(), 1);
        assert_eq!(result.found[&key("a")].value, StoredValue::from("1"));
        assert_eq!(result.missing, vec![key("b")]);
    }

    #[tokio::test]
    async fn test_document_remove_multi_reports_missing_after_all() {
        let store = MemoryDocumentStore::new();
        store
            .upsert(&key("a"), &StoredValue::from("1"), Expiry::Never)
            .await
            .unwrap();
        store
            .upsert(&key("c"), &StoredValue::from("3"), Expiry::Never)
            .await
            .unwrap();
        let err = store
            .remove_multi(&[key("a"), key("b"), key("c")])
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::not_found(&key("b")));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_document_counter() {
        let store = MemoryDocumentStore::new();
        let err = store.counter(&key("n"), 1).await.unwrap_err();
        assert!(err.is_not_found());

        store
            .upsert(&key("n"), &StoredValue::from("10"), Expiry::Never)
            .await
            .unwrap();
        assert_eq!(store.counter(&key("n"), 5).await.unwrap(), 15);
        assert_eq!(store.counter(&key("n"), -20).await.unwrap(), 0);
        assert_eq!(store.peek(&key("n")).await, Some(StoredValue::from("0")));

        store
            .upsert(&key("s"), &StoredValue::from("abc"), Expiry::Never)
            .await
            .unwrap();
        assert!(matches!(
            store.counter(&key("s"), 1).await,
            Err(StoreError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_document_append_prepend() {
        let store = MemoryDocumentStore::new();
        assert_eq!(
            store.append(&key("a"), "x").await.unwrap_err(),
            StoreError::NotStored { key: key("a") }
        );
        store
            .upsert(&key("a"), &StoredValue::from("mid"), Expiry::Never)
            .await
            .unwrap();
        store.append(&key("a"), "-end").await.unwrap();
        store.prepend(&key("a"), "start-").await.unwrap();
        assert_eq!(
            store.peek(&key("a")).await,
            Some(StoredValue::from("start-mid-end"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_and_touch() {
        let store = MemoryDocumentStore::new();
        store
            .upsert(&key("a"), &StoredValue::from("v"), Expiry::from_secs(60))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        store.touch(&key("a"), Expiry::from_secs(60)).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(store.get(&key("a")).await.unwrap().is_some());
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(store.get(&key("a")).await.unwrap().is_none());
        let err = store.touch(&key("a"), Expiry::Never).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = MemoryDocumentStore::new();
        store.set_available(false);
        let err = store.get(&key("a")).await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(store.calls(), 1);

        let cache = MemoryCacheStore::new();
        cache.set_available(false);
        let err = cache.delete(&key("a")).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::unavailable(StoreKind::Cache, "connection refused")
        );
        cache.set_available(true);
        assert!(!cache.delete(&key("a")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_each_call() {
        let store = MemoryDocumentStore::new();
        store.set_latency(Duration::from_millis(40));

        let started = Instant::now();
        store
            .upsert(&key("a"), &StoredValue::from("v"), Expiry::Never)
            .await
            .unwrap();
        assert!(store.get(&key("a")).await.unwrap().is_some());
        assert_eq!(started.elapsed(), Duration::from_millis(80));

        store.set_latency(Duration::ZERO);
        let started = Instant::now();
        store.get(&key("a")).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_cache_add_replace() {
        let cache = MemoryCacheStore::new();
        let v = StoredValue::from("v");
        assert!(!cache.replace(&key("a"), &v, Expiry::Never).await.unwrap());
        assert!(cache.add(&key("a"), &v, Expiry::Never).await.unwrap());
        assert!(!cache.add(&key("a"), &v, Expiry::Never).await.unwrap());
        assert!(cache.replace(&key("a"), &v, Expiry::Never).await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_counters() {
        let cache = MemoryCacheStore::new();
        assert_eq!(cache.incr(&key("n"), 1).await.unwrap(), None);
        cache
            .set(&key("n"), &StoredValue::from("5"), Expiry::Never)
            .await
            .unwrap();
        assert_eq!(cache.incr(&key("n"), 3).await.unwrap(), Some(8));
        assert_eq!(cache.decr(&key("n"), 100).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_cache_cas() {
        let cache = MemoryCacheStore::new();
        let v = StoredValue::from("v");
        assert_eq!(
            cache
                .cas(&key("a"), &v, VersionToken::new(1), Expiry::Never)
                .await
                .unwrap(),
            CasOutcome::Absent
        );
        cache.set(&key("a"), &v, Expiry::Never).await.unwrap();
        let token = cache.gets(&key("a")).await.unwrap().unwrap().version;
        assert_eq!(
            cache
                .cas(&key("a"), &StoredValue::from("w"), token, Expiry::Never)
                .await
                .unwrap(),
            CasOutcome::Applied
        );
        assert_eq!(
            cache
                .cas(&key("a"), &StoredValue::from("x"), token, Expiry::Never)
                .await
                .unwrap(),
            CasOutcome::Conflict
        );
        assert_eq!(cache.peek(&key("a")).await, Some(StoredValue::from("w")));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache = MemoryCacheStore::new();
        let handle = cache.clone();
        cache
            .set(&key("a"), &StoredValue::from("v"), Expiry::Never)
            .await
            .unwrap();
        assert_eq!(handle.peek(&key("a")).await, Some(StoredValue::from("v")));
        assert_eq!(handle.calls(), 1);
    }
}
