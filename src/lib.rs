//! # astrotile
//!
//! A deep-zoom tile server for astronomical imagery.
//!
//! Large survey images (thousands of pixels on a side) are pre-cut into
//! pyramids of PNG tiles so a pan/zoom viewer can fetch only what it
//! displays. This library generates those pyramids and serves them over
//! HTTP from local disk or S3-compatible object storage, together with
//! optional per-tile classification labels produced offline.
//!
//! ## Features
//!
//! - **Pyramid geometry**: deterministic level-of-detail math shared by
//!   the generator and the server, so tile addresses always agree
//! - **Pluggable storage**: local filesystem, S3/MinIO, or in-memory
//!   backends behind one trait
//! - **Label lookups**: batched label backend with an expiring in-memory
//!   cache and negative caching
//! - **Offline generation**: Lanczos-resampled tile pyramids from a single
//!   source raster
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`pyramid`] - Level-of-detail math, tile addressing, and generation
//! - [`store`] - Blob storage backends and the tile store
//! - [`label`] - Label backends and the expiring label cache
//! - [`service`] - Request-facing tile service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use astrotile::server::{create_router, RouterConfig};
//! use astrotile::service::TileService;
//! use astrotile::store::{LocalBlobStore, TileStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let blob = Arc::new(LocalBlobStore::new("./tiles"));
//!     let service = TileService::new(TileStore::new(blob), None);
//!     let router = create_router(service, RouterConfig::default());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod label;
pub mod pyramid;
pub mod server;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::{Cli, Command, GenerateConfig, ServeConfig, StorageConfig};
pub use error::{GenerateError, GeometryError, LabelError, ServeError, StoreError};
pub use label::{JsonFileBackend, LabelBackend, LabelBatch, LabelCache, PooledBackend};
pub use pyramid::{
    compute_max_zoom, config_path, generate_tileset, tile_path, CancelFlag, GenerateOptions,
    GenerateSummary, LevelGeometry, PyramidConfig, TileKey, DEFAULT_MIN_LEVEL_SIZE,
    DEFAULT_TILE_SIZE,
};
pub use server::{create_router, AppState, RouterConfig};
pub use service::TileService;
pub use store::{
    create_s3_client, BlobStore, LocalBlobStore, MemoryBlobStore, S3BlobStore, TileArtifact,
    TileStore,
};
