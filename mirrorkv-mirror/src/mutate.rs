//! Delete and mutate path.
//!
//! Every operation here runs a document-store leg and a cache-store leg
//! concurrently and waits for both. Per-key existence errors from the
//! document store are recorded in the [`Outcome`]; anything else from
//! either leg is returned as an error once both legs have finished.

use std::future::Future;

use mirrorkv_core::{
    Expiry, MirrorError, MirrorResult, Outcome, StoreError, StoreKey, StoreResult, StoredValue,
};
use mirrorkv_storage::{CacheStore, DocumentStore};
use tracing::{debug, warn};

use crate::Mirror;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Delete,
    DeleteMulti,
    Incr,
    Decr,
    Touch,
    Replace,
    Add,
    Append,
    Prepend,
}

impl Mutation {
    fn name(self) -> &'static str {
        match self {
            Mutation::Delete => "delete",
            Mutation::DeleteMulti => "delete_multi",
            Mutation::Incr => "incr",
            Mutation::Decr => "decr",
            Mutation::Touch => "touch",
            Mutation::Replace => "replace",
            Mutation::Add => "add",
            Mutation::Append => "append",
            Mutation::Prepend => "prepend",
        }
    }

    /// Whether a document-store error is recorded rather than returned.
    fn absorbs(self, err: &StoreError) -> bool {
        match self {
            Mutation::Add => matches!(err, StoreError::AlreadyExists { .. }),
            Mutation::Append | Mutation::Prepend => matches!(
                err,
                StoreError::NotFound { .. } | StoreError::NotStored { .. }
            ),
            _ => err.is_not_found(),
        }
    }
}

/// Run both legs to completion and merge them into an [`Outcome`].
///
/// `subject` names the key (or key set) in log events.
async fn mirrored<T, DF, CF>(
    mutation: Mutation,
    subject: &str,
    document: DF,
    cache: CF,
) -> MirrorResult<Outcome>
where
    DF: Future<Output = StoreResult<T>>,
    CF: Future<Output = StoreResult<bool>>,
{
    let (document, cache) = tokio::join!(document, cache);

    let document_error = match document {
        Ok(_) => None,
        Err(err) if mutation.absorbs(&err) => Some(err),
        Err(err) => {
            warn!(op = mutation.name(), key = subject, error = %err, "document leg failed");
            if let Err(cache_err) = &cache {
                warn!(op = mutation.name(), key = subject, error = %cache_err, "cache leg failed");
            }
            return Err(err.into());
        }
    };
    let cache_status = cache.map_err(|err| {
        warn!(op = mutation.name(), key = subject, error = %err, "cache leg failed");
        err
    })?;

    let outcome = Outcome::new()
        .with_document_error(document_error)
        .with_cache_status(cache_status);
    if outcome.diverged() {
        warn!(op = mutation.name(), key = subject, %outcome, "stores diverged");
    } else {
        debug!(op = mutation.name(), key = subject, %outcome, "mirrored");
    }
    Ok(outcome)
}

impl<D, C> Mirror<D, C>
where
    D: DocumentStore,
    C: CacheStore,
{
    /// Delete a key from both stores. Deleting an absent key is not an error.
    pub async fn delete(&self, key: &StoreKey) -> MirrorResult<Outcome> {
        mirrored(
            Mutation::Delete,
            key.as_str(),
            self.document.remove(key),
            self.cache.delete(key),
        )
        .await
    }

    /// Delete several keys from both stores.
    ///
    /// The recorded document error names the first key that was missing.
    pub async fn delete_multi(&self, keys: &[StoreKey]) -> MirrorResult<Outcome> {
        let subject = format!("{} keys", keys.len());
        mirrored(
            Mutation::DeleteMulti,
            &subject,
            self.document.remove_multi(keys),
            self.cache.delete_many(keys),
        )
        .await
    }

    /// Increment a decimal counter in both stores.
    pub async fn incr(&self, key: &StoreKey, delta: u64) -> MirrorResult<Outcome> {
        self.incr_decr(Mutation::Incr, key, delta).await
    }

    /// Decrement a decimal counter in both stores. Counters floor at zero.
    pub async fn decr(&self, key: &StoreKey, delta: u64) -> MirrorResult<Outcome> {
        self.incr_decr(Mutation::Decr, key, delta).await
    }

    /// Reset a key's expiration in both stores.
    pub async fn touch(&self, key: &StoreKey, expiry: Expiry) -> MirrorResult<Outcome> {
        mirrored(
            Mutation::Touch,
            key.as_str(),
            self.document.touch(key, expiry),
            self.cache.touch(key, expiry),
        )
        .await
    }

    /// Overwrite a value only where the key already exists.
    pub async fn replace(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> MirrorResult<Outcome> {
        mirrored(
            Mutation::Replace,
            key.as_str(),
            self.document.replace(key, value, expiry),
            self.cache.replace(key, value, expiry),
        )
        .await
    }

    /// Store a value only where the key is absent.
    ///
    /// An existing document is recorded as `AlreadyExists`; the cache result
    /// is kept as reported.
    pub async fn add(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> MirrorResult<Outcome> {
        mirrored(
            Mutation::Add,
            key.as_str(),
            self.document.insert(key, value, expiry),
            self.cache.add(key, value, expiry),
        )
        .await
    }

    /// Append text to an existing value in both stores.
    pub async fn append(&self, key: &StoreKey, value: &StoredValue) -> MirrorResult<Outcome> {
        self.append_prepend(Mutation::Append, key, value).await
    }

    /// Prepend text to an existing value in both stores.
    pub async fn prepend(&self, key: &StoreKey, value: &StoredValue) -> MirrorResult<Outcome> {
        self.append_prepend(Mutation::Prepend, key, value).await
    }

    async fn incr_decr(
        &self,
        mutation: Mutation,
        key: &StoreKey,
        delta: u64,
    ) -> MirrorResult<Outcome> {
        let magnitude = i64::try_from(delta).map_err(|_| StoreError::Rejected {
            key: key.clone(),
            reason: format!("delta {} exceeds {}", delta, i64::MAX),
        })?;
        let increment = mutation == Mutation::Incr;
        let signed = if increment { magnitude } else { -magnitude };

        let cache = async {
            let adjusted = if increment {
                self.cache.incr(key, delta).await
            } else {
                self.cache.decr(key, delta).await
            };
            adjusted.map(|value| value.is_some())
        };
        mirrored(
            mutation,
            key.as_str(),
            self.document.counter(key, signed),
            cache,
        )
        .await
    }

    async fn append_prepend(
        &self,
        mutation: Mutation,
        key: &StoreKey,
        value: &StoredValue,
    ) -> MirrorResult<Outcome> {
        let text = value.as_text().ok_or_else(|| MirrorError::Codec {
            reason: format!("{} payload for {} is not valid UTF-8", mutation.name(), key),
        })?;

        if mutation == Mutation::Append {
            mirrored(
                mutation,
                key.as_str(),
                self.document.append(key, text),
                self.cache.append(key, value),
            )
            .await
        } else {
            mirrored(
                mutation,
                key.as_str(),
                self.document.prepend(key, text),
                self.cache.prepend(key, value),
            )
            .await
        }
    }
}
