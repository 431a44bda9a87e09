//! Request-facing tile service.
//!
//! Owns the pyramid metadata cache and coordinates the storage and label
//! layers. This is where raw coordinates are validated against the grid:
//! the store below it only knows paths, and the handlers above it only
//! know HTTP.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{GeometryError, LabelError, ServeError, StoreError};
use crate::label::{LabelBatch, LabelCache};
use crate::pyramid::{PyramidConfig, TileKey};
use crate::store::{TileArtifact, TileStore};

/// Number of pyramid metadata records kept in memory.
///
/// Records are tiny and immutable once generated, so this only bounds
/// pathological deployments with thousands of image sets.
const CONFIG_CACHE_SIZE: usize = 64;

/// Serves tiles, pyramid metadata, and tile labels.
pub struct TileService {
    tiles: TileStore,
    labels: Option<Arc<LabelCache>>,
    configs: RwLock<LruCache<String, Arc<PyramidConfig>>>,
}

impl TileService {
    /// Create a service over a tile store, optionally with a label cache.
    ///
    /// Without a label cache the label operations report the label store
    /// as unconfigured; tile serving is unaffected.
    pub fn new(tiles: TileStore, labels: Option<Arc<LabelCache>>) -> Self {
        Self {
            tiles,
            labels,
            configs: RwLock::new(LruCache::new(
                NonZeroUsize::new(CONFIG_CACHE_SIZE).unwrap(),
            )),
        }
    }

    /// Fetch one tile, validating the coordinate against the image set's
    /// grid first.
    ///
    /// # Errors
    ///
    /// - `UnknownImageSet` if no pyramid metadata exists for `image_set`
    /// - `CoordinateOutOfRange` if `(level, x, y)` is outside the grid
    /// - `TileNotFound` if the coordinate is valid but the artifact is
    ///   absent
    /// - `Store` on backend failure or corrupt metadata
    pub async fn serve_tile(
        &self,
        image_set: &str,
        level: u32,
        x: u32,
        y: u32,
    ) -> Result<TileArtifact, ServeError> {
        let config = self.config(image_set).await?;

        let geom = config.level_geometry(level).map_err(|e| match e {
            GeometryError::ZoomOutOfRange { .. } | GeometryError::InvalidDimension { .. } => {
                ServeError::CoordinateOutOfRange {
                    image_set: image_set.to_string(),
                    level,
                    x,
                    y,
                }
            }
        })?;
        if !geom.contains(x, y) {
            return Err(ServeError::CoordinateOutOfRange {
                image_set: image_set.to_string(),
                level,
                x,
                y,
            });
        }

        let key = TileKey::new(image_set, level, x, y);
        let data = self.tiles.get_tile(&key).await.map_err(|e| match e {
            StoreError::NotFound(path) => ServeError::TileNotFound { path },
            other => ServeError::Store(other),
        })?;

        let (width, height) = geom.tile_extent(x, y);
        Ok(TileArtifact {
            data,
            width,
            height,
        })
    }

    /// Pyramid metadata for one image set.
    ///
    /// # Errors
    ///
    /// `UnknownImageSet` if no metadata record exists; `Store` on backend
    /// failure or a corrupt record.
    pub async fn serve_image_info(&self, image_set: &str) -> Result<Arc<PyramidConfig>, ServeError> {
        self.config(image_set).await
    }

    /// Batched label lookup for a set of tile artifact paths.
    ///
    /// Empty input returns an empty batch without touching the label
    /// subsystem at all, so the endpoint works even when labels are
    /// unconfigured.
    ///
    /// # Errors
    ///
    /// `Labels(Unconfigured)` if no label store was configured.
    pub async fn serve_labels(&self, keys: Vec<String>) -> Result<LabelBatch, ServeError> {
        if keys.is_empty() {
            return Ok(LabelBatch::default());
        }
        let cache = self.label_cache()?;
        Ok(cache.get_many(keys).await)
    }

    /// Label lookup for a single tile artifact path.
    ///
    /// `Ok(None)` means the tile has no label.
    ///
    /// # Errors
    ///
    /// `Labels(Unconfigured)` if no label store was configured;
    /// `Labels(Unavailable)` if the backend is down and no fresh cache
    /// entry exists.
    pub async fn serve_label(&self, key: &str) -> Result<Option<String>, ServeError> {
        let cache = self.label_cache()?;
        Ok(cache.get(key).await?)
    }

    /// Whether a label store is configured.
    pub fn labels_configured(&self) -> bool {
        self.labels.is_some()
    }

    fn label_cache(&self) -> Result<&Arc<LabelCache>, ServeError> {
        self.labels
            .as_ref()
            .ok_or(ServeError::Labels(LabelError::Unconfigured))
    }

    /// Resolve pyramid metadata through the in-memory cache.
    async fn config(&self, image_set: &str) -> Result<Arc<PyramidConfig>, ServeError> {
        if let Some(config) = self.configs.write().await.get(image_set) {
            return Ok(config.clone());
        }

        debug!(image_set = image_set, "loading pyramid metadata");
        let config = self
            .tiles
            .load_config(image_set)
            .await
            .map(Arc::new)
            .map_err(|e| match e {
                StoreError::NotFound(_) => ServeError::UnknownImageSet {
                    image_set: image_set.to_string(),
                },
                other => ServeError::Store(other),
            })?;

        self.configs
            .write()
            .await
            .put(image_set.to_string(), config.clone());
        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================
