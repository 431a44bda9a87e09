//! Router configuration for the tile server.
//!
//! This module defines the HTTP routes and applies CORS and tracing
//! middleware.
//!
//! # Route Structure
//!
//! ```text
//! /health                                  - Health check
//! /tiles/{image_set}/{level}/{x}/{y}.png   - Tile endpoint
//! /info/{image_set}                        - Pyramid metadata
//! /tile-label                              - Single label lookup
//! /batch-tile-labels                       - Batch label lookup
//! ```
//!
//! # Example
//!
//! ```ignore
//! use astrotile::server::{create_router, RouterConfig};
//! use astrotile::service::TileService;
//!
//! let service = TileService::new(tile_store, None);
//! let router = create_router(service, RouterConfig::default());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    batch_labels_handler, health_handler, image_info_handler, label_handler, tile_handler,
    AppState,
};
use crate::service::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds for tile responses
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    /// Defaults: any CORS origin (the viewer runs on a different port),
    /// 1-hour cache max-age, tracing enabled.
    fn default() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }
}

impl RouterConfig {
    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Builds the complete Axum router with the tile, metadata, label, and
/// health routes plus CORS and optional request tracing.
pub fn create_router(service: TileService, config: RouterConfig) -> Router {
    let app_state = AppState::with_cache_max_age(service, config.cache_max_age);
    let cors = build_cors_layer(&config);

    // Uses {filename} to capture both "{y}" and "{y}.png" formats
    let router = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/tiles/{image_set}/{level}/{x}/{filename}",
            get(tile_handler),
        )
        .route("/info/{image_set}", get(image_info_handler))
        .route("/tile-label", get(label_handler))
        .route("/batch-tile-labels", post(batch_labels_handler))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
