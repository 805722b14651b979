//! Read path: primary first, secondary for misses.

use std::collections::{HashMap, HashSet};

use mirrorkv_core::{MirrorResult, Primary, StoreKey, StoreKind, StoredValue, Versioned};
use mirrorkv_storage::{CacheStore, DocumentStore};
use tracing::debug;

use crate::Mirror;

impl<D, C> Mirror<D, C>
where
    D: DocumentStore,
    C: CacheStore,
{
    /// Get a value.
    ///
    /// Queries the primary store. If it has no value (or an empty one) and
    /// `try_alternate` is set, queries the secondary store. Returns the
    /// first non-empty value, or None if both miss.
    pub async fn get(
        &self,
        key: &StoreKey,
        try_alternate: bool,
    ) -> MirrorResult<Option<StoredValue>> {
        let found = self.read_one(self.primary.store(), key).await?;
        match found {
            Some(value) if !value.is_empty() => return Ok(Some(value)),
            other if !try_alternate => return Ok(other),
            _ => {}
        }

        debug!(
            key = %key,
            store = %self.primary.secondary(),
            "primary miss, reading secondary"
        );
        let alternate = self.read_one(self.primary.secondary(), key).await?;
        Ok(alternate.filter(|value| !value.is_empty()))
    }

    /// Get several values.
    ///
    /// The secondary store is queried only for the keys the primary missed,
    /// so a primary value is never replaced by a secondary one. The result
    /// holds only keys that were found.
    pub async fn get_multi(
        &self,
        keys: &[StoreKey],
        try_alternate: bool,
    ) -> MirrorResult<HashMap<StoreKey, StoredValue>> {
        let (mut found, missing) = self.read_many(self.primary.store(), keys).await?;

        if try_alternate && !missing.is_empty() {
            debug!(
                missing = missing.len(),
                store = %self.primary.secondary(),
                "reading primary misses from secondary"
            );
            let (alternate, _) = self.read_many(self.primary.secondary(), &missing).await?;
            for (key, value) in alternate {
                found.entry(key).or_insert(value);
            }
        }

        Ok(found)
    }

    /// Get a value with the primary store's version token.
    ///
    /// Only the primary store is read; the token is valid for [`Mirror::cas`].
    pub async fn gets(&self, key: &StoreKey) -> MirrorResult<Option<Versioned>> {
        Ok(match self.primary {
            Primary::Document => self.document.get(key).await?,
            Primary::Cache => self.cache.gets(key).await?,
        })
    }

    /// Get several values with the primary store's version tokens.
    pub async fn gets_multi(
        &self,
        keys: &[StoreKey],
    ) -> MirrorResult<HashMap<StoreKey, Versioned>> {
        Ok(match self.primary {
            Primary::Document => self.document.get_multi(keys).await?.found,
            Primary::Cache => self.cache.gets_many(keys).await?,
        })
    }

    async fn read_one(
        &self,
        store: StoreKind,
        key: &StoreKey,
    ) -> MirrorResult<Option<StoredValue>> {
        Ok(match store {
            StoreKind::Document => self.document.get(key).await?.map(|found| found.value),
            StoreKind::Cache => self.cache.get(key).await?,
        })
    }

    /// Found values plus the requested keys the store did not have.
    async fn read_many(
        &self,
        store: StoreKind,
        keys: &[StoreKey],
    ) -> MirrorResult<(HashMap<StoreKey, StoredValue>, Vec<StoreKey>)> {
        match store {
            StoreKind::Document => {
                let result = self.document.get_multi(keys).await?;
                let found = result
                    .found
                    .into_iter()
                    .map(|(key, versioned)| (key, versioned.value))
                    .collect();
                Ok((found, result.missing))
            }
            StoreKind::Cache => {
                let found = self.cache.get_many(keys).await?;
                let mut seen = HashSet::with_capacity(keys.len());
                let missing = keys
                    .iter()
                    .filter(|key| !found.contains_key(*key) && seen.insert(*key))
                    .cloned()
                    .collect();
                Ok((found, missing))
            }
        }
    }
}
