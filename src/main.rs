//! astrotile - a deep-zoom tile server for astronomical imagery.
//!
//! This binary starts the HTTP server or runs the offline tile generator.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use astrotile::{
    config::{Cli, Command, GenerateConfig, ServeConfig, StorageConfig},
    label::{JsonFileBackend, LabelCache, PooledBackend},
    pyramid::{generate_tileset, CancelFlag, GenerateOptions},
    server::{create_router, RouterConfig},
    service::TileService,
    store::{create_s3_client, BlobStore, LocalBlobStore, S3BlobStore, TileStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::Generate(config) => run_generate(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    match (&config.storage.tiles_dir, &config.storage.s3_bucket) {
        (Some(dir), _) => info!("  Storage: local directory {}", dir.display()),
        (None, Some(bucket)) => {
            info!("  Storage: s3://{}", bucket);
            if !config.storage.s3_prefix.is_empty() {
                info!("  S3 prefix: {}", config.storage.s3_prefix);
            }
            if let Some(ref endpoint) = config.storage.s3_endpoint {
                info!("  S3 endpoint: {}", endpoint);
            }
            info!("  S3 region: {}", config.storage.s3_region);
        }
        (None, None) => unreachable!("validated above"),
    }

    // Wire the label subsystem if a label file was configured
    let labels = match &config.labels_file {
        Some(path) => {
            info!("  Labels: {}", path.display());
            let backend = match JsonFileBackend::from_path(path).await {
                Ok(backend) => backend,
                Err(e) => {
                    error!("Failed to load label file: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            info!("  Loaded {} label(s)", backend.len());

            let pooled = PooledBackend::new(backend, config.label_pool_size);
            let expiry = Duration::from_secs(config.label_cache_ttl);
            Some(Arc::new(LabelCache::with_expiry(Arc::new(pooled), expiry)))
        }
        None => {
            warn!("  Labels: not configured - label endpoints will return 503");
            None
        }
    };

    let blob = build_blob_store(&config.storage).await;
    let service = TileService::new(TileStore::new(blob), labels);

    let router_config = build_router_config(&config);
    let router = create_router(service, router_config);

    let addr = config.bind_address();
    info!("Server listening on http://{}", addr);
    info!("  Tiles:  GET /tiles/{{image_set}}/{{z}}/{{x}}/{{y}}.png");
    info!("  Info:   GET /info/{{image_set}}");
    info!("  Health: GET /health");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::default()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Generate Command
// =============================================================================

async fn run_generate(config: GenerateConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Loading source image {}", config.source.display());
    let source_path = config.source.clone();
    let source = match tokio::task::spawn_blocking(move || image::open(&source_path)).await {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => {
            error!("Failed to open {}: {}", config.source.display(), e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Image decode task failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let blob = build_blob_store(&config.storage).await;
    let store = TileStore::new(blob);

    let options = GenerateOptions {
        tile_size: config.tile_size,
        min_level_size: config.min_level_size,
    };

    // Ctrl-C stops the run at the next level boundary
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested, finishing current level");
                cancel.cancel();
            }
        });
    }

    match generate_tileset(&store, &config.image_set, &source, &options, &cancel).await {
        Ok(summary) => {
            info!(
                "Generated {} tile(s) across {} level(s) for '{}'",
                summary.tiles_written,
                summary.max_level + 1,
                config.image_set
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Generation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Shared Setup
// =============================================================================

/// Build the configured blob store backend.
async fn build_blob_store(storage: &StorageConfig) -> Arc<dyn BlobStore> {
    match (&storage.tiles_dir, &storage.s3_bucket) {
        (Some(dir), _) => Arc::new(LocalBlobStore::new(dir.clone())),
        (None, Some(bucket)) => {
            let client =
                create_s3_client(storage.s3_endpoint.as_deref(), &storage.s3_region).await;
            let prefix = if storage.s3_prefix.is_empty() {
                None
            } else {
                Some(storage.s3_prefix.clone())
            };
            Arc::new(S3BlobStore::new(client, bucket.clone(), prefix))
        }
        (None, None) => unreachable!("storage configuration validated before use"),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "astrotile=debug,tower_http=debug"
    } else {
        "astrotile=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
