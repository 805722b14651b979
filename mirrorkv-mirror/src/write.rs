//! Write path: the document store first, then the cache.

use mirrorkv_core::{Expiry, MirrorResult, Outcome, StoreKey, StoredValue};
use mirrorkv_storage::{CacheStore, DocumentStore};
use tracing::{debug, warn};

use crate::Mirror;

impl<D, C> Mirror<D, C>
where
    D: DocumentStore,
    C: CacheStore,
{
    /// Store a value in both stores.
    ///
    /// The document store is written first. If that write fails the error is
    /// returned and the cache is not written, so the cache never holds a
    /// value the document store rejected.
    pub async fn set(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> MirrorResult<Outcome> {
        self.document.upsert(key, value, expiry).await.map_err(|err| {
            warn!(key = %key, error = %err, "document write failed, cache skipped");
            err
        })?;
        let stored = self.cache.set(key, value, expiry).await.map_err(|err| {
            warn!(key = %key, error = %err, "cache write failed after document write");
            err
        })?;
        if !stored {
            warn!(key = %key, "cache did not store value");
        }
        debug!(key = %key, cache_status = stored, "set");
        Ok(Outcome::new().with_cache_status(stored))
    }

    /// Store several values in both stores.
    pub async fn set_multi(
        &self,
        items: &[(StoreKey, StoredValue)],
        expiry: Expiry,
    ) -> MirrorResult<Outcome> {
        self.document.upsert_multi(items, expiry).await.map_err(|err| {
            warn!(items = items.len(), error = %err, "document write failed, cache skipped");
            err
        })?;
        let stored = self.cache.set_many(items, expiry).await.map_err(|err| {
            warn!(items = items.len(), error = %err, "cache write failed after document write");
            err
        })?;
        if !stored {
            warn!(items = items.len(), "cache did not store every value");
        }
        debug!(items = items.len(), cache_status = stored, "set_multi");
        Ok(Outcome::new().with_cache_status(stored))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use mirrorkv_core::{Expiry, MirrorError, Primary, StoreError, StoreKind};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_set_writes_both_stores() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        let outcome = mirror
            .set(&key("k"), &value("v"), Expiry::from_secs(60))
            .await
            .unwrap();

        assert!(outcome.success());
        assert!(!outcome.diverged());
        assert_eq!(document.peek(&key("k")).await, Some(value("v")));
        assert_eq!(cache.peek(&key("k")).await, Some(value("v")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_writes_document_before_cache() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        document.set_latency(Duration::from_millis(50));
        cache.set_latency(Duration::from_millis(30));

        let started = Instant::now();
        mirror
            .set(&key("k"), &value("v"), Expiry::Never)
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_set_skips_cache_when_document_unavailable() {
        let (mirror, document, cache) = memory_mirror(Primary::Cache);
        document.set_available(false);

        let err = mirror
            .set(&key("k"), &value("v"), Expiry::Never)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MirrorError::Store(StoreError::Unavailable { store: StoreKind::Document, .. })
        ));
        assert_eq!(cache.calls(), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_propagates_cache_unavailable() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        cache.set_available(false);

        let err = mirror
            .set(&key("k"), &value("v"), Expiry::Never)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MirrorError::Store(StoreError::Unavailable { store: StoreKind::Cache, .. })
        ));
        assert_eq!(document.peek(&key("k")).await, Some(value("v")));
    }

    #[tokio::test]
    async fn test_set_multi_writes_both_stores() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        let items = vec![(key("a"), value("1")), (key("b"), value("2"))];

        let outcome = mirror.set_multi(&items, Expiry::Never).await.unwrap();
        assert!(outcome.success());
        assert_eq!(document.len().await, 2);
        assert_eq!(cache.peek(&key("b")).await, Some(value("2")));
    }

    #[tokio::test]
    async fn test_set_multi_skips_cache_when_document_unavailable() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        document.set_available(false);

        let items = vec![(key("a"), value("1"))];
        assert!(mirror.set_multi(&items, Expiry::Never).await.is_err());
        assert_eq!(cache.calls(), 0);
    }
}
