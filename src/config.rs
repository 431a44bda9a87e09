//! Configuration management for the tile server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap, with `serve` and `generate` subcommands
//! - Environment variables with `ASTROTILE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use astrotile::config::{Cli, Command};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Command::Serve(config) => { /* run the server */ }
//!     Command::Generate(config) => { /* generate a tile pyramid */ }
//! }
//! ```
//!
//! # Environment Variables
//!
//! Storage settings can be set via environment variables with the
//! `ASTROTILE_` prefix:
//!
//! - `ASTROTILE_HOST` - Server bind address (default: 0.0.0.0)
//! - `ASTROTILE_PORT` - Server port (default: 8000)
//! - `ASTROTILE_TILES_DIR` - Local tile directory (local storage mode)
//! - `ASTROTILE_S3_BUCKET` - S3 bucket name (S3 storage mode)
//! - `ASTROTILE_S3_PREFIX` - Key prefix within the bucket
//! - `ASTROTILE_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `ASTROTILE_S3_REGION` - AWS region (default: us-east-1)
//! - `ASTROTILE_LABELS_FILE` - JSON label file (optional)
//! - `ASTROTILE_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default label cache expiry in seconds (5 minutes).
pub const DEFAULT_LABEL_CACHE_TTL: u64 = 300;

/// Default label backend connection pool size.
pub const DEFAULT_LABEL_POOL_SIZE: usize = 8;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// astrotile - a deep-zoom tile server for astronomical imagery.
///
/// Serves pre-generated PNG tile pyramids from local disk or S3-compatible
/// storage, with optional per-tile classification labels.
#[derive(Parser, Debug, Clone)]
#[command(name = "astrotile")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the tile server.
    Serve(ServeConfig),

    /// Generate a tile pyramid from a source image.
    Generate(GenerateConfig),
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Storage backend selection, shared by both subcommands.
///
/// Exactly one of `--tiles-dir` (local filesystem) or `--s3-bucket` must
/// be provided.
#[derive(Args, Debug, Clone)]
pub struct StorageConfig {
    /// Local directory containing the tile sets.
    #[arg(long, env = "ASTROTILE_TILES_DIR")]
    pub tiles_dir: Option<PathBuf>,

    /// S3 bucket name containing the tile sets.
    #[arg(long, env = "ASTROTILE_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Key prefix within the S3 bucket (e.g. "tiles").
    #[arg(long, default_value = "", env = "ASTROTILE_S3_PREFIX")]
    pub s3_prefix: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    ///
    /// If not specified, uses the default AWS S3 endpoint.
    #[arg(long, env = "ASTROTILE_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "ASTROTILE_S3_REGION")]
    pub s3_region: String,
}

impl StorageConfig {
    /// Validate the storage selection.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.tiles_dir, &self.s3_bucket) {
            (None, None) => Err(
                "No storage backend selected. Set --tiles-dir or --s3-bucket \
                 (ASTROTILE_TILES_DIR / ASTROTILE_S3_BUCKET)"
                    .to_string(),
            ),
            (Some(_), Some(_)) => Err(
                "Both --tiles-dir and --s3-bucket are set; pick one storage backend".to_string(),
            ),
            (Some(_), None) | (None, Some(_)) => Ok(()),
        }
    }
}

// =============================================================================
// Serve Configuration
// =============================================================================

/// Configuration for the `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "ASTROTILE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "ASTROTILE_PORT")]
    pub port: u16,

    #[command(flatten)]
    pub storage: StorageConfig,

    /// JSON file mapping tile artifact paths to labels.
    ///
    /// When omitted, the label endpoints report the label store as
    /// unconfigured; tile serving is unaffected.
    #[arg(long, env = "ASTROTILE_LABELS_FILE")]
    pub labels_file: Option<PathBuf>,

    /// Label cache expiry in seconds.
    #[arg(long, default_value_t = DEFAULT_LABEL_CACHE_TTL, env = "ASTROTILE_LABEL_CACHE_TTL")]
    pub label_cache_ttl: u64,

    /// Maximum concurrent calls into the label backend.
    #[arg(long, default_value_t = DEFAULT_LABEL_POOL_SIZE, env = "ASTROTILE_LABEL_POOL_SIZE")]
    pub label_pool_size: usize,

    /// HTTP Cache-Control max-age in seconds for tile responses.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "ASTROTILE_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "ASTROTILE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;

        if self.label_cache_ttl == 0 {
            return Err("label_cache_ttl must be greater than 0".to_string());
        }
        if self.label_pool_size == 0 {
            return Err("label_pool_size must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Generate Configuration
// =============================================================================

/// Configuration for the `generate` subcommand.
#[derive(Args, Debug, Clone)]
pub struct GenerateConfig {
    /// Source image to tile (PNG or JPEG).
    pub source: PathBuf,

    /// Name of the image set to generate (e.g. "blue_fits").
    pub image_set: String,

    #[command(flatten)]
    pub storage: StorageConfig,

    /// Tile edge length in pixels.
    #[arg(long, default_value_t = crate::pyramid::DEFAULT_TILE_SIZE)]
    pub tile_size: u32,

    /// Smallest edge length tolerated at the coarsest zoom level.
    #[arg(long, default_value_t = crate::pyramid::DEFAULT_MIN_LEVEL_SIZE)]
    pub min_level_size: u32,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl GenerateConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;

        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.min_level_size == 0 {
            return Err("min_level_size must be greater than 0".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
