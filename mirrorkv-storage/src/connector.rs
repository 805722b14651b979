//! Store construction seam.
//!
//! A [`StoreConnector`] turns connection descriptors into store clients.
//! Network drivers provide their own connector; [`MemoryConnector`] hands
//! out in-memory stores and remembers them so tests can inspect what the
//! mirror wrote.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mirrorkv_core::{CacheNode, StoreResult};
use tokio::sync::Mutex;

use crate::{CacheStore, DocumentStore, MemoryCacheStore, MemoryDocumentStore};

/// Builds store clients from connection descriptors.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Document: DocumentStore + 'static;
    type Cache: CacheStore + 'static;

    /// Connect to the document store at `uri`.
    async fn connect_document(&self, uri: &str) -> StoreResult<Self::Document>;

    /// Connect to a single cache node.
    async fn connect_cache_node(&self, node: &CacheNode) -> StoreResult<Self::Cache>;
}

/// Connector for in-memory stores.
///
/// Connecting twice to the same URI or node returns handles to the same
/// store.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    documents: Arc<Mutex<HashMap<String, MemoryDocumentStore>>>,
    caches: Arc<Mutex<HashMap<CacheNode, MemoryCacheStore>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document store previously connected under `uri`.
    pub async fn document(&self, uri: &str) -> Option<MemoryDocumentStore> {
        self.documents.lock().await.get(uri).cloned()
    }

    /// The cache node previously connected under `node`.
    pub async fn cache_node(&self, node: &CacheNode) -> Option<MemoryCacheStore> {
        self.caches.lock().await.get(node).cloned()
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    type Document = MemoryDocumentStore;
    type Cache = MemoryCacheStore;

    async fn connect_document(&self, uri: &str) -> StoreResult<MemoryDocumentStore> {
        let mut documents = self.documents.lock().await;
        Ok(documents.entry(uri.to_string()).or_default().clone())
    }

    async fn connect_cache_node(&self, node: &CacheNode) -> StoreResult<MemoryCacheStore> {
        let mut caches = self.caches.lock().await;
        Ok(caches.entry(node.clone()).or_default().clone())
    }
}
