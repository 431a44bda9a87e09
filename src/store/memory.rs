//! In-memory blob store.
//!
//! Holds objects in a map guarded by an async lock. Intended for tests
//! and examples; behaves like the real backends down to the `NotFound`
//! versus `Unavailable` distinction.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::StoreError;

use super::BlobStore;

/// Map-backed implementation of [`BlobStore`].
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// All stored paths, sorted. Handy for asserting on generation output.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.objects.read().await.contains_key(path))
    }

    async fn get(&self, path: &str) -> Result<Bytes, StoreError> {
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), StoreError> {
        self.objects.write().await.insert(path.to_string(), data);
        Ok(())
    }
}
