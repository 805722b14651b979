//! Compare-and-swap against the primary store's version tokens.

use mirrorkv_core::{
    CasOutcome, Expiry, MirrorResult, Primary, StoreError, StoreKey, StoredValue, VersionToken,
};
use mirrorkv_storage::{CacheStore, DocumentStore};
use tracing::{debug, warn};

use crate::Mirror;

impl<D, C> Mirror<D, C>
where
    D: DocumentStore,
    C: CacheStore,
{
    /// Store a value only if the primary store's token for the key still
    /// equals `version`.
    ///
    /// With the document store as primary, a successful swap is followed by
    /// an unconditional cache write of the same value. With the cache as
    /// primary, only the cache's native CAS runs and the document store is
    /// not touched.
    ///
    /// Once the document swap has committed the result is `Applied`. A cache
    /// write that fails or stores nothing afterwards is logged and leaves the
    /// cache stale until the next write or delete of the key.
    pub async fn cas(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        version: VersionToken,
        expiry: Expiry,
    ) -> MirrorResult<CasOutcome> {
        let outcome = match self.primary {
            Primary::Document => self.swap_document(key, value, version, expiry).await?,
            Primary::Cache => self.cache.cas(key, value, version, expiry).await?,
        };

        debug!(key = %key, primary = %self.primary, ?outcome, "cas");
        Ok(outcome)
    }

    async fn swap_document(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        version: VersionToken,
        expiry: Expiry,
    ) -> MirrorResult<CasOutcome> {
        match self
            .document
            .replace_versioned(key, value, version, expiry)
            .await
        {
            Ok(_) => {}
            Err(StoreError::VersionConflict { .. }) => return Ok(CasOutcome::Conflict),
            Err(err) if err.is_not_found() => return Ok(CasOutcome::Absent),
            Err(err) => return Err(err.into()),
        }

        match self.cache.set(key, value, expiry).await {
            Ok(true) => {}
            Ok(false) => warn!(key = %key, "cache did not store swapped value"),
            Err(err) => warn!(key = %key, error = %err, "cache write failed after swap"),
        }
        Ok(CasOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use mirrorkv_core::{
        CasOutcome, Expiry, MirrorError, Primary, StoreError, StoreKind, VersionToken,
    };
    use mirrorkv_storage::DocumentStore;

    #[tokio::test]
    async fn test_cas_document_applied_updates_cache() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        mirror
            .set(&key("k"), &value("one"), Expiry::Never)
            .await
            .unwrap();
        let token = mirror.gets(&key("k")).await.unwrap().unwrap().version;

        let outcome = mirror
            .cas(&key("k"), &value("two"), token, Expiry::Never)
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Applied);
        assert_eq!(document.peek(&key("k")).await, Some(value("two")));
        assert_eq!(cache.peek(&key("k")).await, Some(value("two")));
    }

    #[tokio::test]
    async fn test_cas_document_applied_writes_cache_even_when_absent_there() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        let token = document
            .upsert(&key("k"), &value("one"), Expiry::Never)
            .await
            .unwrap();

        let outcome = mirror
            .cas(&key("k"), &value("two"), token, Expiry::Never)
            .await
            .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(cache.peek(&key("k")).await, Some(value("two")));
    }

    #[tokio::test]
    async fn test_cas_document_applied_when_cache_unavailable() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        let token = document
            .upsert(&key("k"), &value("one"), Expiry::Never)
            .await
            .unwrap();
        cache.set_available(false);

        let outcome = mirror
            .cas(&key("k"), &value("two"), token, Expiry::Never)
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Applied);
        assert_eq!(document.peek(&key("k")).await, Some(value("two")));
        assert_eq!(cache.calls(), 1);

        let retry = mirror
            .cas(&key("k"), &value("three"), token, Expiry::Never)
            .await
            .unwrap();
        assert_eq!(retry, CasOutcome::Conflict);
        assert_eq!(document.peek(&key("k")).await, Some(value("two")));
    }

    #[tokio::test]
    async fn test_cas_document_conflict_leaves_cache() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        mirror
            .set(&key("k"), &value("one"), Expiry::Never)
            .await
            .unwrap();
        let token = mirror.gets(&key("k")).await.unwrap().unwrap().version;
        mirror
            .set(&key("k"), &value("racer"), Expiry::Never)
            .await
            .unwrap();
        let cache_calls = cache.calls();

        let outcome = mirror
            .cas(&key("k"), &value("two"), token, Expiry::Never)
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Conflict);
        assert_eq!(document.peek(&key("k")).await, Some(value("racer")));
        assert_eq!(cache.calls(), cache_calls);
    }

    #[tokio::test]
    async fn test_cas_document_absent() {
        let (mirror, _, cache) = memory_mirror(Primary::Document);
        let outcome = mirror
            .cas(&key("k"), &value("v"), VersionToken::new(1), Expiry::Never)
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Absent);
        assert_eq!(cache.calls(), 0);
    }

    #[tokio::test]
    async fn test_cas_document_unavailable_propagates() {
        let (mirror, document, cache) = memory_mirror(Primary::Document);
        document.set_available(false);
        let err = mirror
            .cas(&key("k"), &value("v"), VersionToken::new(1), Expiry::Never)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MirrorError::Store(StoreError::Unavailable { store: StoreKind::Document, .. })
        ));
        assert_eq!(cache.calls(), 0);
    }

    #[tokio::test]
    async fn test_cas_cache_primary_never_touches_document() {
        let (mirror, document, cache) = memory_mirror(Primary::Cache);
        mirror
            .set(&key("k"), &value("one"), Expiry::Never)
            .await
            .unwrap();
        let token = mirror.gets(&key("k")).await.unwrap().unwrap().version;
        let document_calls = document.calls();

        let outcome = mirror
            .cas(&key("k"), &value("two"), token, Expiry::Never)
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Applied);
        assert_eq!(cache.peek(&key("k")).await, Some(value("two")));
        assert_eq!(document.peek(&key("k")).await, Some(value("one")));

        let outcome = mirror
            .cas(&key("k"), &value("three"), token, Expiry::Never)
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Conflict);

        let outcome = mirror
            .cas(&key("missing"), &value("x"), token, Expiry::Never)
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Absent);
        assert_eq!(document.calls(), document_calls);
    }
}
