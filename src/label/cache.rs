//! Expiring label cache.
//!
//! Sits in front of the batched label backend and shields it from the
//! bursty, heavily overlapping lookups a pan/zoom viewer produces: every
//! visible tile triggers a label query, and most of them were queried
//! moments ago.
//!
//! # Entry Lifecycle
//!
//! An entry records the backend's answer for one key, including "no label
//! exists" (negative caching), with the time it was inserted. Entries
//! older than the expiry window are treated as absent and refreshed before
//! being trusted. The cache lives and dies with the process; nothing is
//! persisted.
//!
//! # Concurrency
//!
//! Entry updates are atomic per call under a write lock, but the
//! miss-then-populate sequence is deliberately not exclusive: two
//! concurrent misses for the same key may both query the backend. That
//! costs one duplicate round trip and never correctness.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::LabelError;

use super::backend::LabelBackend;

/// Default expiry window for cached entries.
pub const DEFAULT_EXPIRY_WINDOW: Duration = Duration::from_secs(300);

/// One cached lookup result. `value: None` records a known-absent key.
struct CacheEntry {
    value: Option<String>,
    inserted_at: Instant,
}

/// Result of a batch lookup.
#[derive(Debug, Clone, Default)]
pub struct LabelBatch {
    /// Resolved labels; keys with no label are absent, never null
    pub labels: HashMap<String, String>,

    /// True when the backend could not be reached for some keys.
    ///
    /// Fresh cache hits are still present in `labels`; a partial outage
    /// degrades label completeness, it never fails the lookup.
    pub degraded: bool,
}

/// Time-expiring cache over a [`LabelBackend`].
pub struct LabelCache {
    backend: Arc<dyn LabelBackend>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    expiry: Duration,
}

impl LabelCache {
    /// Create a cache with the default expiry window.
    pub fn new(backend: Arc<dyn LabelBackend>) -> Self {
        Self::with_expiry(backend, DEFAULT_EXPIRY_WINDOW)
    }

    /// Create a cache with a custom expiry window.
    pub fn with_expiry(backend: Arc<dyn LabelBackend>, expiry: Duration) -> Self {
        Self {
            backend,
            entries: RwLock::new(HashMap::new()),
            expiry,
        }
    }

    /// Look up labels for `keys`, serving fresh cache entries directly
    /// and issuing at most one backend call for the rest.
    ///
    /// Keys with no known label are absent from the result. For a fixed
    /// key, repeated calls within the expiry window hit the backend at
    /// most once; known-absent keys are cached too and do not re-trigger
    /// lookups. Duplicate input keys are deduplicated. Empty input
    /// returns immediately without touching the backend.
    pub async fn get_many<I>(&self, keys: I) -> LabelBatch
    where
        I: IntoIterator<Item = String>,
    {
        let mut labels = HashMap::new();
        let mut missing: Vec<String> = Vec::new();

        {
            let now = Instant::now();
            let entries = self.entries.read().await;
            let mut seen = HashSet::new();
            for key in keys {
                if !seen.insert(key.clone()) {
                    continue;
                }
                match entries.get(&key) {
                    Some(entry) if now - entry.inserted_at < self.expiry => {
                        // Fresh: serve the value, or skip a known-absent key
                        if let Some(value) = &entry.value {
                            labels.insert(key, value.clone());
                        }
                    }
                    _ => missing.push(key),
                }
            }
        }

        if missing.is_empty() {
            return LabelBatch {
                labels,
                degraded: false,
            };
        }

        debug!(
            cached = labels.len(),
            missing = missing.len(),
            "label cache lookup"
        );

        match self.backend.batch_get(&missing).await {
            Ok(found) => {
                let mut entries = self.entries.write().await;
                let now = Instant::now();
                for key in missing {
                    let value = found.get(&key).cloned();
                    if let Some(v) = &value {
                        labels.insert(key.clone(), v.clone());
                    }
                    entries.insert(
                        key,
                        CacheEntry {
                            value,
                            inserted_at: now,
                        },
                    );
                }
                LabelBatch {
                    labels,
                    degraded: false,
                }
            }
            Err(e) => {
                warn!(
                    missing = missing.len(),
                    "label backend lookup failed: {}", e
                );
                LabelBatch {
                    labels,
                    degraded: true,
                }
            }
        }
    }

    /// Look up a single label.
    ///
    /// `Ok(None)` means the key has no label; `Unavailable` means the
    /// backend could not be reached and no fresh cache entry existed.
    pub async fn get(&self, key: &str) -> Result<Option<String>, LabelError> {
        let batch = self.get_many([key.to_string()]).await;
        if batch.degraded {
            return Err(LabelError::Unavailable(format!(
                "lookup failed for {}",
                key
            )));
        }
        Ok(batch.labels.get(key).cloned())
    }

    /// Drop the entry for `key`, forcing the next lookup to the backend.
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Number of cached entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
