//! Tile-pyramid geometry and offline generation.

mod generate;
mod geometry;

pub use generate::{generate_tileset, CancelFlag, GenerateOptions, GenerateSummary};
pub use geometry::{
    compute_max_zoom, config_path, tile_path, LevelGeometry, PyramidConfig, TileKey,
    DEFAULT_MIN_LEVEL_SIZE, DEFAULT_TILE_SIZE,
};
