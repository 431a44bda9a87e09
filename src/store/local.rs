//! Local-filesystem blob store.
//!
//! Mirrors the blob path layout as a directory tree under a configured
//! root, e.g. `"{root}/{image_set}/{z}/{x}/{y}.png"`. Useful for
//! development and for serving a tile set generated onto local disk.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::error::StoreError;

use super::BlobStore;

/// Filesystem implementation of [`BlobStore`].
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new store rooted at `root`. The directory does not need
    /// to exist yet; `put` creates intermediate directories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a blob path to a filesystem path.
    ///
    /// Blob paths come partly from request URLs, so parent-dir and
    /// absolute components are rejected rather than resolved.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(StoreError::NotFound(path.to_string()));
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let full = self.resolve(path)?;
        match fs::metadata(&full).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    async fn get(&self, path: &str) -> Result<Bytes, StoreError> {
        let full = self.resolve(path)?;
        match fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        fs::write(&full, &data)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
