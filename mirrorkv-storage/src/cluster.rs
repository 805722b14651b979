//! Hash-distributed cache cluster.
//!
//! [`HashedCacheStore`] presents several cache nodes as one [`CacheStore`].
//! Each key is owned by exactly one node, chosen by rendezvous hashing:
//! the node with the highest `SHA-256(node || key)` score wins. Adding or
//! removing a node only moves the keys that node owned.
//!
//! Multi-key calls are split per node and the per-node calls run
//! concurrently.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use futures_util::future::join_all;
use mirrorkv_core::{
    CacheNode, CasOutcome, ConfigError, Expiry, StoreKey, StoreResult, StoredValue, VersionToken,
    Versioned,
};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::CacheStore;

/// A cache store that shards keys over several node clients.
#[derive(Debug, Clone)]
pub struct HashedCacheStore<C> {
    nodes: Vec<(CacheNode, C)>,
}

impl<C: CacheStore> HashedCacheStore<C> {
    /// Build a cluster from node clients. At least one node is required.
    pub fn new(nodes: Vec<(CacheNode, C)>) -> Result<Self, ConfigError> {
        if nodes.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "cache_nodes".to_string(),
            });
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CacheNode> {
        self.nodes.iter().map(|(node, _)| node)
    }

    /// Index of the node that owns `key`.
    pub fn node_index(&self, key: &StoreKey) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .max_by_key(|(_, (node, _))| score(node, key))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    /// Address of the node that owns `key`.
    pub fn node_for(&self, key: &StoreKey) -> &CacheNode {
        &self.nodes[self.node_index(key)].0
    }

    fn client(&self, key: &StoreKey) -> &C {
        &self.nodes[self.node_index(key)].1
    }

    /// Group keys by owning node, preserving request order within a group.
    fn partition<T, F>(&self, items: &[T], key_of: F) -> Vec<(usize, Vec<T>)>
    where
        T: Clone,
        F: Fn(&T) -> &StoreKey,
    {
        let mut groups: Vec<Vec<T>> = vec![Vec::new(); self.nodes.len()];
        for item in items {
            groups[self.node_index(key_of(item))].push(item.clone());
        }
        groups
            .into_iter()
            .enumerate()
            .filter(|(_, group)| !group.is_empty())
            .collect()
    }

    /// Run one call per node group concurrently. Every call completes before
    /// the first failure is returned.
    async fn fan_out<'a, T, R, F, Fut>(
        &'a self,
        groups: &'a [(usize, Vec<T>)],
        call: F,
    ) -> StoreResult<Vec<R>>
    where
        F: Fn(&'a C, &'a [T]) -> Fut,
        Fut: Future<Output = StoreResult<R>>,
    {
        let results = join_all(
            groups
                .iter()
                .map(|(index, group)| call(&self.nodes[*index].1, group.as_slice())),
        )
        .await;

        let mut merged = Vec::with_capacity(results.len());
        for ((index, _), result) in groups.iter().zip(results) {
            match result {
                Ok(value) => merged.push(value),
                Err(err) => {
                    warn!(node = %self.nodes[*index].0, error = %err, "cache node call failed");
                    return Err(err);
                }
            }
        }
        Ok(merged)
    }
}

fn score(node: &CacheNode, key: &StoreKey) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(node.host.as_bytes());
    hasher.update(node.port.to_be_bytes());
    hasher.update([0u8]);
    hasher.update(key.as_str().as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

#[async_trait]
impl<C: CacheStore> CacheStore for HashedCacheStore<C> {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<StoredValue>> {
        self.client(key).get(key).await
    }

    async fn get_many(&self, keys: &[StoreKey]) -> StoreResult<HashMap<StoreKey, StoredValue>> {
        let groups = self.partition(keys, |key| key);
        let results = self
            .fan_out(&groups, |client, group| client.get_many(group))
            .await?;
        Ok(results.into_iter().flatten().collect())
    }

    async fn gets(&self, key: &StoreKey) -> StoreResult<Option<Versioned>> {
        self.client(key).gets(key).await
    }

    async fn gets_many(&self, keys: &[StoreKey]) -> StoreResult<HashMap<StoreKey, Versioned>> {
        let groups = self.partition(keys, |key| key);
        let results = self
            .fan_out(&groups, |client, group| client.gets_many(group))
            .await?;
        Ok(results.into_iter().flatten().collect())
    }

    async fn set(&self, key: &StoreKey, value: &StoredValue, expiry: Expiry) -> StoreResult<bool> {
        self.client(key).set(key, value, expiry).await
    }

    async fn set_many(
        &self,
        items: &[(StoreKey, StoredValue)],
        expiry: Expiry,
    ) -> StoreResult<bool> {
        let groups = self.partition(items, |(key, _)| key);
        let results = self
            .fan_out(&groups, |client, group| client.set_many(group, expiry))
            .await?;
        Ok(results.into_iter().all(|stored| stored))
    }

    async fn add(&self, key: &StoreKey, value: &StoredValue, expiry: Expiry) -> StoreResult<bool> {
        self.client(key).add(key, value, expiry).await
    }

    async fn replace(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        expiry: Expiry,
    ) -> StoreResult<bool> {
        self.client(key).replace(key, value, expiry).await
    }

    async fn delete(&self, key: &StoreKey) -> StoreResult<bool> {
        self.client(key).delete(key).await
    }

    async fn delete_many(&self, keys: &[StoreKey]) -> StoreResult<bool> {
        let groups = self.partition(keys, |key| key);
        let results = self
            .fan_out(&groups, |client, group| client.delete_many(group))
            .await?;
        Ok(results.into_iter().all(|deleted| deleted))
    }

    async fn incr(&self, key: &StoreKey, delta: u64) -> StoreResult<Option<u64>> {
        self.client(key).incr(key, delta).await
    }

    async fn decr(&self, key: &StoreKey, delta: u64) -> StoreResult<Option<u64>> {
        self.client(key).decr(key, delta).await
    }

    async fn touch(&self, key: &StoreKey, expiry: Expiry) -> StoreResult<bool> {
        self.client(key).touch(key, expiry).await
    }

    async fn append(&self, key: &StoreKey, value: &StoredValue) -> StoreResult<bool> {
        self.client(key).append(key, value).await
    }

    async fn prepend(&self, key: &StoreKey, value: &StoredValue) -> StoreResult<bool> {
        self.client(key).prepend(key, value).await
    }

    async fn cas(
        &self,
        key: &StoreKey,
        value: &StoredValue,
        version: VersionToken,
        expiry: Expiry,
    ) -> StoreResult<CasOutcome> {
        self.client(key).cas(key, value, version, expiry).await
    }
}
