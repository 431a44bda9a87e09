//! Tile store: resolves tile keys and pyramid metadata against a blob
//! backend.
//!
//! This layer does not know about grids or coordinate validity. A request
//! for a coordinate that was never generated simply reports `NotFound`;
//! distinguishing "out of grid" from "in-grid but absent" belongs to the
//! service layer, which has the pyramid geometry at hand.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::pyramid::{config_path, PyramidConfig, TileKey};

use super::BlobStore;

/// Maximum attempts for an idempotent blob read when the backend reports
/// itself unavailable. `NotFound` is never retried.
pub const MAX_GET_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubled after each failed attempt.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// An encoded tile plus its pixel dimensions.
///
/// Dimensions are derived from level geometry, not by decoding the image;
/// edge tiles are smaller than the nominal tile size.
#[derive(Debug, Clone)]
pub struct TileArtifact {
    /// Encoded PNG bytes
    pub data: Bytes,

    /// Tile width in pixels
    pub width: u32,

    /// Tile height in pixels
    pub height: u32,
}

/// Maps [`TileKey`]s and image-set names to persisted artifacts.
pub struct TileStore {
    blob: Arc<dyn BlobStore>,
}

impl TileStore {
    /// Create a tile store over the given blob backend.
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self { blob }
    }

    /// Get the underlying blob backend.
    pub fn blob(&self) -> &Arc<dyn BlobStore> {
        &self.blob
    }

    /// Fetch the encoded bytes of one tile.
    ///
    /// Transient backend failures are retried with doubling backoff, up
    /// to [`MAX_GET_ATTEMPTS`] attempts in total. A missing object is
    /// returned immediately as `NotFound`.
    pub async fn get_tile(&self, key: &TileKey) -> Result<Bytes, StoreError> {
        self.get_with_retry(&key.artifact_path()).await
    }

    /// Persist the encoded bytes of one tile at its canonical path.
    pub async fn put_tile(&self, key: &TileKey, data: Bytes) -> Result<(), StoreError> {
        self.blob.put(&key.artifact_path(), data).await
    }

    /// Load the persisted pyramid metadata record for an image set.
    pub async fn load_config(&self, image_set: &str) -> Result<PyramidConfig, StoreError> {
        let path = config_path(image_set);
        let data = self.get_with_retry(&path).await?;
        serde_json::from_slice(&data).map_err(|e| StoreError::Corrupt {
            path,
            message: e.to_string(),
        })
    }

    /// Persist the pyramid metadata record for an image set.
    pub async fn store_config(
        &self,
        image_set: &str,
        config: &PyramidConfig,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_vec(config).map_err(|e| StoreError::Corrupt {
            path: config_path(image_set),
            message: e.to_string(),
        })?;
        self.blob.put(&config_path(image_set), Bytes::from(data)).await
    }

    /// Idempotent read with bounded retry on `Unavailable`.
    async fn get_with_retry(&self, path: &str) -> Result<Bytes, StoreError> {
        let mut delay = RETRY_BASE_DELAY;
        let mut attempt = 1;
        loop {
            match self.blob.get(path).await {
                Ok(data) => return Ok(data),
                Err(StoreError::Unavailable(reason)) if attempt < MAX_GET_ATTEMPTS => {
                    warn!(
                        path = path,
                        attempt = attempt,
                        "blob read failed, retrying in {:?}: {}",
                        delay,
                        reason
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    if matches!(e, StoreError::NotFound(_)) {
                        debug!(path = path, "blob not found");
                    }
                    return Err(e);
                }
            }
        }
    }
}
