//! Offline tile-pyramid generation.
//!
//! Turns one large source raster into a complete tile set: for each zoom
//! level the source is resampled to the level's scaled dimensions with a
//! Lanczos3 filter, cut into tiles, and each tile is PNG-encoded and
//! persisted at its canonical path. The pyramid metadata record is written
//! first so a crashed run leaves a set that is readable, just incomplete.
//!
//! Crop policy: tile windows at the right and bottom edges are clipped to
//! the scaled raster, so edge tiles come out smaller than the nominal tile
//! size. Tiles that would clip to zero area are not written at all.
//!
//! Generation is a one-shot batch job. Running it concurrently for the
//! same image set is the caller's responsibility to prevent; cancellation
//! is honored between zoom levels only, never mid-tile.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::info;

use crate::error::GenerateError;
use crate::store::TileStore;

use super::geometry::{PyramidConfig, TileKey};

/// Knobs for a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Smallest edge length tolerated at the coarsest zoom level
    pub min_level_size: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            tile_size: super::geometry::DEFAULT_TILE_SIZE,
            min_level_size: super::geometry::DEFAULT_MIN_LEVEL_SIZE,
        }
    }
}

/// What a generation run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    /// Maximum zoom level of the generated pyramid
    pub max_level: u32,

    /// Number of tile artifacts written
    pub tiles_written: u64,
}

/// Shared flag for cancelling a generation run from another task
/// (e.g. a Ctrl-C handler). Checked between zoom levels.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Generate the full tile pyramid for `source` under `image_set`.
///
/// Writes the [`PyramidConfig`] record, then every tile of every level
/// from 0 (coarsest) to `max_level` (native resolution), in deterministic
/// row-major order per level.
///
/// # Errors
///
/// - `Geometry` if the source has a zero dimension
/// - `Encode` if a tile cannot be PNG-encoded
/// - `Store` if the backend rejects a write
/// - `Cancelled` if the cancel flag was set between levels
pub async fn generate_tileset(
    store: &TileStore,
    image_set: &str,
    source: &DynamicImage,
    options: &GenerateOptions,
    cancel: &CancelFlag,
) -> Result<GenerateSummary, GenerateError> {
    let (width, height) = (source.width(), source.height());
    let config = PyramidConfig::new(width, height, options.tile_size, options.min_level_size)?;

    info!(
        image_set = image_set,
        width = width,
        height = height,
        max_level = config.max_level,
        "generating tile pyramid"
    );

    store.store_config(image_set, &config).await?;

    let mut tiles_written = 0u64;
    for level in 0..=config.max_level {
        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled { level });
        }

        let geom = config.level_geometry(level)?;
        if geom.scaled_width == 0 || geom.scaled_height == 0 {
            info!(level = level, "level has zero area, skipping");
            continue;
        }

        let scaled = if level == config.max_level {
            source.clone()
        } else {
            source.resize_exact(geom.scaled_width, geom.scaled_height, FilterType::Lanczos3)
        };

        let mut level_tiles = 0u64;
        for (x, y) in geom.tiles() {
            let (tile_w, tile_h) = geom.tile_extent(x, y);
            let tile = scaled.crop_imm(x * geom.tile_size, y * geom.tile_size, tile_w, tile_h);

            let key = TileKey::new(image_set, level, x, y);
            let mut buf = Cursor::new(Vec::new());
            tile.write_to(&mut buf, image::ImageFormat::Png)
                .map_err(|e| GenerateError::Encode {
                    path: key.artifact_path(),
                    message: e.to_string(),
                })?;

            store.put_tile(&key, Bytes::from(buf.into_inner())).await?;
            level_tiles += 1;
        }
        tiles_written += level_tiles;

        info!(
            level = level,
            width = geom.scaled_width,
            height = geom.scaled_height,
            tiles = level_tiles,
            "level complete"
        );
    }

    Ok(GenerateSummary {
        max_level: config.max_level,
        tiles_written,
    })
}
