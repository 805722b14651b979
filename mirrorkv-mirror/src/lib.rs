//! mirrorkv Mirror - Coordinator over a Document Store and a Cache Store
//!
//! [`Mirror`] owns one [`DocumentStore`] and one [`CacheStore`] plus a fixed
//! [`Primary`] designation, and exposes one consolidated API over both.
//!
//! # Policy
//!
//! - **Reads** go to the primary store first. The secondary is consulted
//!   only for misses, and only when the caller allows it.
//! - **Versioned reads and CAS** use the primary store alone. Version tokens
//!   from the two stores are never mixed.
//! - **Writes** (`set`, `set_multi`) go to the document store, then the
//!   cache. A document-store failure is returned and the cache is left
//!   untouched.
//! - **Deletes and mutations** run both legs concurrently and always to
//!   completion. Per-key existence errors from the document store are
//!   recorded in the returned [`Outcome`]; transport failures are returned
//!   as errors.
//!
//! The two stores are not updated atomically. A reader racing a writer may
//! see the new value in one store and the old value in the other.
//!
//! # Example
//!
//! ```ignore
//! let mirror = Mirror::new(document, cache, Primary::Document);
//! mirror.set(&key, &value, Expiry::from_secs(60)).await?;
//! let read = mirror.get(&key, true).await?;
//! let outcome = mirror.delete(&key).await?;
//! assert!(outcome.success());
//! ```

mod cas;
mod mutate;
mod read;
mod write;

use std::fmt;
use std::sync::Arc;

use mirrorkv_core::{MirrorConfig, MirrorResult, Primary};
use mirrorkv_storage::{CacheStore, DocumentStore, HashedCacheStore, StoreConnector};

pub use mirrorkv_core::{
    CasOutcome, Expiry, MirrorError, Outcome, StoreError, StoreKey, StoredValue, VersionToken,
    Versioned,
};

/// Coordinator that mirrors key-value operations across two stores.
pub struct Mirror<D, C>
where
    D: DocumentStore,
    C: CacheStore,
{
    /// The authoritative document store.
    document: Arc<D>,
    /// The volatile cache store.
    cache: Arc<C>,
    /// Which store governs read order and CAS.
    primary: Primary,
}

impl<D, C> Mirror<D, C>
where
    D: DocumentStore,
    C: CacheStore,
{
    /// Create a mirror over two store clients.
    pub fn new(document: D, cache: C, primary: Primary) -> Self {
        Self::from_shared(Arc::new(document), Arc::new(cache), primary)
    }

    /// Create a mirror over store clients that are shared elsewhere.
    pub fn from_shared(document: Arc<D>, cache: Arc<C>, primary: Primary) -> Self {
        Self {
            document,
            cache,
            primary,
        }
    }

    /// The primary designation fixed at construction.
    pub fn primary(&self) -> Primary {
        self.primary
    }

    /// The document store client.
    pub fn document(&self) -> &D {
        &self.document
    }

    /// The cache store client.
    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<D, C> Mirror<D, HashedCacheStore<C>>
where
    D: DocumentStore,
    C: CacheStore,
{
    /// Build a mirror from configuration: connect to the document store,
    /// connect every cache node and distribute keys over the nodes.
    pub async fn connect<K>(config: &MirrorConfig, connector: &K) -> MirrorResult<Self>
    where
        K: StoreConnector<Document = D, Cache = C>,
    {
        config.validate()?;

        let document = connector.connect_document(&config.document_uri).await?;

        let mut nodes = Vec::with_capacity(config.cache_nodes.len());
        for node in &config.cache_nodes {
            let client = connector.connect_cache_node(node).await?;
            nodes.push((node.clone(), client));
        }
        let cache = HashedCacheStore::new(nodes)?;

        tracing::info!(
            document_uri = %config.document_uri,
            cache_nodes = config.cache_nodes.len(),
            primary = %config.primary,
            "Mirror connected"
        );

        Ok(Self::new(document, cache, config.primary))
    }
}

impl<D, C> Clone for Mirror<D, C>
where
    D: DocumentStore,
    C: CacheStore,
{
    fn clone(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
            cache: Arc::clone(&self.cache),
            primary: self.primary,
        }
    }
}

impl<D, C> fmt::Debug for Mirror<D, C>
where
    D: DocumentStore,
    C: CacheStore,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mirror")
            .field("primary", &self.primary)
            .finish_non_exhaustive()
    }
}
