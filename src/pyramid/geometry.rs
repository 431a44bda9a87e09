//! Pyramid level-of-detail math.
//!
//! Derives the shape of a tile pyramid (max zoom, per-level dimensions,
//! tile grid) from the source raster dimensions and the tile edge length.
//! All functions here are pure; nothing touches storage.
//!
//! # Level Numbering
//!
//! Level 0 is the coarsest zoom (whole image shrunk to at most
//! `min_level_size` on its longest edge) and `max_level` is the native
//! resolution. At level `z` the image is scaled by `1 / 2^(max_level - z)`.
//!
//! # Tile Grid
//!
//! Each level is cut into square tiles of `tile_size` pixels. The grid is
//! inclusive on both axes: `x` runs over `[0, cols]` and `y` over
//! `[0, rows]`, so the rightmost column and bottom row are usually partial
//! tiles, clipped at the raster edge. When a dimension divides evenly by
//! `tile_size` the trailing tile would be zero-area; those are suppressed.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Default smallest edge length tolerated at the coarsest zoom level.
///
/// Prevents degenerate single-pixel top levels.
pub const DEFAULT_MIN_LEVEL_SIZE: u32 = 512;

// =============================================================================
// Tile Key
// =============================================================================

/// Identifies one tile in one image set's pyramid.
///
/// Used as a lookup key throughout the crate; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Image set name (e.g. "andromeda_blue")
    pub image_set: String,

    /// Zoom level (0 = coarsest)
    pub level: u32,

    /// Tile column (0-indexed from left)
    pub x: u32,

    /// Tile row (0-indexed from top)
    pub y: u32,
}

impl TileKey {
    /// Create a new tile key.
    pub fn new(image_set: impl Into<String>, level: u32, x: u32, y: u32) -> Self {
        Self {
            image_set: image_set.into(),
            level,
            x,
            y,
        }
    }

    /// Canonical key string, `"{image_set}/{z}/{x}/{y}"`.
    pub fn canonical(&self) -> String {
        tile_path(&self.image_set, self.level, self.x, self.y)
    }

    /// Storage path of the encoded artifact, `"{image_set}/{z}/{x}/{y}.png"`.
    ///
    /// This string is also the key used by the label store, so the two
    /// subsystems agree on it bit-for-bit.
    pub fn artifact_path(&self) -> String {
        format!("{}.png", self.canonical())
    }
}

/// Canonical key for a tile coordinate, `"{image_set}/{z}/{x}/{y}"`.
pub fn tile_path(image_set: &str, level: u32, x: u32, y: u32) -> String {
    format!("{}/{}/{}/{}", image_set, level, x, y)
}

/// Storage path of an image set's persisted pyramid metadata record.
pub fn config_path(image_set: &str) -> String {
    format!("{}/config", image_set)
}

// =============================================================================
// Max Zoom
// =============================================================================

/// Compute the maximum zoom level for a source raster.
///
/// `max_level = ceil(log2(max(width, height) / min_level_size))`, clamped
/// at 0. Computed with integer doubling to avoid float rounding at
/// power-of-two boundaries.
///
/// # Errors
///
/// `InvalidDimension` if either dimension is zero.
pub fn compute_max_zoom(
    width: u32,
    height: u32,
    min_level_size: u32,
) -> Result<u32, GeometryError> {
    if width == 0 || height == 0 {
        return Err(GeometryError::InvalidDimension { width, height });
    }

    let max_dim = u64::from(width.max(height));
    let mut level = 0u32;
    let mut size = u64::from(min_level_size.max(1));
    while size < max_dim {
        size *= 2;
        level += 1;
    }
    Ok(level)
}

// =============================================================================
// Pyramid Config
// =============================================================================

/// Persisted pyramid shape for one image set.
///
/// Computed once at tile-generation time, stored as a small JSON record at
/// [`config_path`], and read-only thereafter. Field names on the wire are
/// camelCase (`tileSize`, `maxLevel`) to match the viewer contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PyramidConfig {
    /// Source raster width in pixels
    pub width: u32,

    /// Source raster height in pixels
    pub height: u32,

    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Maximum zoom level (level of native resolution)
    pub max_level: u32,
}

impl PyramidConfig {
    /// Derive a pyramid config from source dimensions.
    ///
    /// # Errors
    ///
    /// `InvalidDimension` if either dimension or `tile_size` is zero.
    pub fn new(
        width: u32,
        height: u32,
        tile_size: u32,
        min_level_size: u32,
    ) -> Result<Self, GeometryError> {
        if tile_size == 0 {
            return Err(GeometryError::InvalidDimension { width, height });
        }
        let max_level = compute_max_zoom(width, height, min_level_size)?;
        Ok(Self {
            width,
            height,
            tile_size,
            max_level,
        })
    }

    /// Geometry of one zoom level.
    ///
    /// # Errors
    ///
    /// `ZoomOutOfRange` if `level > max_level`.
    pub fn level_geometry(&self, level: u32) -> Result<LevelGeometry, GeometryError> {
        if level > self.max_level {
            return Err(GeometryError::ZoomOutOfRange {
                level,
                max_level: self.max_level,
            });
        }

        let scale = 1u64 << (self.max_level - level);
        let scaled_width = (u64::from(self.width) / scale) as u32;
        let scaled_height = (u64::from(self.height) / scale) as u32;

        Ok(LevelGeometry {
            level,
            scaled_width,
            scaled_height,
            cols: scaled_width / self.tile_size,
            rows: scaled_height / self.tile_size,
            tile_size: self.tile_size,
        })
    }
}

// =============================================================================
// Level Geometry
// =============================================================================

/// Derived geometry of a single zoom level. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelGeometry {
    /// Zoom level this geometry describes
    pub level: u32,

    /// Raster width at this level, `floor(width / scale)`
    pub scaled_width: u32,

    /// Raster height at this level, `floor(height / scale)`
    pub scaled_height: u32,

    /// `floor(scaled_width / tile_size)`; the grid spans `x in [0, cols]`
    pub cols: u32,

    /// `floor(scaled_height / tile_size)`; the grid spans `y in [0, rows]`
    pub rows: u32,

    /// Tile edge length in pixels
    pub tile_size: u32,
}

impl LevelGeometry {
    /// Whether `(x, y)` lies inside this level's inclusive tile grid.
    ///
    /// A coordinate may be in-grid and still have no artifact: a trailing
    /// zero-area tile is suppressed at generation time, and a partial
    /// generation run may leave gaps. Those cases are the store's
    /// not-found, not a coordinate error.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x <= self.cols && y <= self.rows && self.scaled_width > 0 && self.scaled_height > 0
    }

    /// Pixel dimensions of the tile at `(x, y)`, clipped at the raster
    /// edge. Zero in either dimension means the tile is suppressed.
    pub fn tile_extent(&self, x: u32, y: u32) -> (u32, u32) {
        let left = x.saturating_mul(self.tile_size);
        let top = y.saturating_mul(self.tile_size);
        let w = self.scaled_width.saturating_sub(left).min(self.tile_size);
        let h = self.scaled_height.saturating_sub(top).min(self.tile_size);
        (w, h)
    }

    /// Largest `x` with a non-zero-area tile.
    fn max_x(&self) -> u32 {
        if self.cols > 0 && self.scaled_width % self.tile_size == 0 {
            self.cols - 1
        } else {
            self.cols
        }
    }

    /// Largest `y` with a non-zero-area tile.
    fn max_y(&self) -> u32 {
        if self.rows > 0 && self.scaled_height % self.tile_size == 0 {
            self.rows - 1
        } else {
            self.rows
        }
    }

    /// Enumerate every tile coordinate at this level in row-major order
    /// (y outer, x inner).
    ///
    /// The order makes generation logs and test fixtures deterministic;
    /// consumers must not rely on it for correctness. Zero-area trailing
    /// tiles (dimensions dividing evenly by `tile_size`) are suppressed.
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32)> {
        let bounds = if self.scaled_width == 0 || self.scaled_height == 0 {
            // Degenerate level, nothing to emit
            None
        } else {
            Some((self.max_x(), self.max_y()))
        };

        bounds.into_iter().flat_map(|(max_x, max_y)| {
            (0..=max_y).flat_map(move |y| (0..=max_x).map(move |x| (x, y)))
        })
    }

    /// Number of tiles this level actually materializes.
    pub fn tile_count(&self) -> u64 {
        if self.scaled_width == 0 || self.scaled_height == 0 {
            return 0;
        }
        u64::from(self.max_x() + 1) * u64::from(self.max_y() + 1)
    }
}

// =============================================================================
// Tests
// =============================================================================
