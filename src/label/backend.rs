//! Label backends.
//!
//! The backing label store is modeled as a batched key-value lookup: one
//! call, many keys, and keys with no stored label are simply absent from
//! the result. The offline classification step produces the
//! `(tile key, label)` pairs these backends serve.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::LabelError;

/// Capability for batched label lookups.
///
/// `batch_get` is an idempotent read; implementations must return only
/// the keys that have a stored label, never null placeholders.
#[async_trait]
pub trait LabelBackend: Send + Sync {
    /// Fetch labels for `keys` in a single round trip.
    async fn batch_get(&self, keys: &[String]) -> Result<HashMap<String, String>, LabelError>;
}

// =============================================================================
// JSON File Backend
// =============================================================================

/// Label backend loaded from a JSON object file at startup.
///
/// The file is a single JSON object mapping canonical tile artifact paths
/// to label strings, as emitted by the offline classifier:
///
/// ```json
/// {
///   "andromeda/4/12/7.png": "spiral_galaxy",
///   "andromeda/4/12/8.png": "star_field"
/// }
/// ```
#[derive(Debug)]
pub struct JsonFileBackend {
    labels: HashMap<String, String>,
}

impl JsonFileBackend {
    /// Load labels from a JSON file.
    pub async fn from_path(path: &Path) -> Result<Self, LabelError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| LabelError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let labels: HashMap<String, String> = serde_json::from_slice(&data)
            .map_err(|e| LabelError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Self { labels })
    }

    /// Build a backend from an in-memory map.
    pub fn from_map(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// Number of loaded labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no labels were loaded.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[async_trait]
impl LabelBackend for JsonFileBackend {
    async fn batch_get(&self, keys: &[String]) -> Result<HashMap<String, String>, LabelError> {
        Ok(keys
            .iter()
            .filter_map(|k| self.labels.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }
}

// =============================================================================
// Pooled Backend
// =============================================================================

/// Bounds concurrent calls into an inner backend, modeling a connection
/// pool of fixed size.
///
/// `batch_get` blocks until a permit is available; the permit is held in
/// a guard so it is returned on every exit path, including failures. Pool
/// exhaustion under error storms is therefore impossible.
pub struct PooledBackend<B> {
    inner: B,
    permits: Arc<Semaphore>,
}

impl<B: LabelBackend> PooledBackend<B> {
    /// Wrap `inner` with a pool of `size` permits.
    pub fn new(inner: B, size: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(size.max(1))),
        }
    }
}

#[async_trait]
impl<B: LabelBackend> LabelBackend for PooledBackend<B> {
    async fn batch_get(&self, keys: &[String]) -> Result<HashMap<String, String>, LabelError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LabelError::Unavailable("connection pool closed".to_string()))?;
        self.inner.batch_get(keys).await
    }
}
