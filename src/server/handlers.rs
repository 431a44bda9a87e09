//! HTTP request handlers for the tile API.
//!
//! This module contains the Axum handlers for serving tiles, pyramid
//! metadata, tile labels, and health checks.
//!
//! # Endpoints
//!
//! - `GET /tiles/{image_set}/{level}/{x}/{y}.png` - Serve a tile
//! - `GET /info/{image_set}` - Pyramid metadata for a viewer
//! - `GET /tile-label?file_path=...` - Look up one tile label
//! - `POST /batch-tile-labels` - Look up labels for many tiles
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{LabelError, ServeError, StoreError};
use crate::service::TileService;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to all handlers via Axum's State
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// The tile service backing all endpoints
    pub service: Arc<TileService>,

    /// Cache-Control max-age in seconds for tile responses
    pub cache_max_age: u32,
}

impl AppState {
    /// Create application state with the default 1-hour cache max-age.
    pub fn new(service: TileService) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age: 3600,
        }
    }

    /// Create application state with a custom cache max-age.
    pub fn with_cache_max_age(service: TileService, cache_max_age: u32) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/tiles/{image_set}/{level}/{x}/{filename}`
/// where filename is `{y}` or `{y}.png`
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Image set identifier (e.g. "blue_fits")
    pub image_set: String,

    /// Zoom level (0 = coarsest)
    pub level: u32,

    /// Tile X coordinate (0-indexed from left)
    pub x: u32,

    /// Tile Y coordinate with optional .png extension (e.g., "0" or "0.png")
    pub filename: String,
}

impl TilePathParams {
    /// Parse the Y coordinate from the filename, stripping any .png extension.
    pub fn y(&self) -> Result<u32, std::num::ParseIntError> {
        let y_str = self.filename.strip_suffix(".png").unwrap_or(&self.filename);
        y_str.parse()
    }
}

/// Query parameters for single-label requests.
#[derive(Debug, Deserialize)]
pub struct LabelQueryParams {
    /// Canonical tile artifact path (e.g. "blue_fits/3/4/5.png")
    pub file_path: String,
}

/// Request body for batch label lookups.
#[derive(Debug, Deserialize)]
pub struct BatchLabelsRequest {
    /// Canonical tile artifact paths to resolve
    #[serde(default)]
    pub file_paths: Vec<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "storage_unavailable")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Pyramid metadata response, shaped for the viewer.
///
/// Field names are camelCase on the wire to match the persisted pyramid
/// record and the viewer contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfoResponse {
    /// Source raster width in pixels
    pub width: u32,

    /// Source raster height in pixels
    pub height: u32,

    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Maximum zoom level
    pub max_level: u32,

    /// Base URL the viewer requests tiles from
    pub tile_source_url: String,
}

/// Single-label response.
#[derive(Debug, Serialize)]
pub struct LabelResponse {
    /// The queried tile artifact path
    pub file_path: String,

    /// The stored label
    pub value: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ServeError to HTTP response.
///
/// Logs errors based on their severity: 5xx at ERROR, 404 at DEBUG
/// (common and expected), other 4xx at WARN.
///
/// All three ways a tile can be absent (unknown image set, coordinate
/// outside the grid, in-grid but never generated) map to a plain 404;
/// the distinction is logged, never sent to the client.
impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ServeError::UnknownImageSet { image_set } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Image set not found: {}", image_set),
            ),

            ServeError::CoordinateOutOfRange {
                image_set,
                level,
                x,
                y,
            } => {
                debug!(
                    image_set = image_set.as_str(),
                    level = level,
                    x = x,
                    y = y,
                    "tile coordinate outside grid"
                );
                (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    "Tile not found".to_string(),
                )
            }

            ServeError::TileNotFound { path } => {
                debug!(path = path.as_str(), "tile artifact absent");
                (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    "Tile not found".to_string(),
                )
            }

            ServeError::Store(StoreError::NotFound(path)) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Resource not found: {}", path),
            ),

            ServeError::Store(StoreError::Unavailable(msg)) => (
                StatusCode::BAD_GATEWAY,
                "storage_unavailable",
                format!("Storage backend unavailable: {}", msg),
            ),

            ServeError::Store(StoreError::Corrupt { path, message }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "corrupt_record",
                format!("Corrupt record at {}: {}", path, message),
            ),

            ServeError::Labels(LabelError::Unavailable(msg)) => (
                StatusCode::BAD_GATEWAY,
                "labels_unavailable",
                format!("Label backend unavailable: {}", msg),
            ),

            ServeError::Labels(LabelError::Unconfigured) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "labels_unconfigured",
                "Label store is not configured".to_string(),
            ),
        };

        // Log errors based on severity
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status.is_client_error() {
            if status == StatusCode::NOT_FOUND {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Resource not found: {}",
                    message
                );
            } else {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Client error: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{image_set}/{level}/{x}/{y}.png`
///
/// # Response
///
/// - `200 OK`: PNG tile image with `Content-Type: image/png`
/// - `404 Not Found`: Unknown image set, coordinate outside the grid, or
///   artifact absent
/// - `502 Bad Gateway`: Storage backend unavailable
/// - `500 Internal Server Error`: Corrupt pyramid metadata
///
/// # Headers
///
/// - `Content-Type: image/png`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Tile-Width` / `X-Tile-Height`: pixel dimensions (edge tiles are
///   smaller than the nominal tile size)
pub async fn tile_handler(
    State(state): State<AppState>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, ServeError> {
    // Parse Y coordinate from filename (handles both "0" and "0.png")
    let y = params.y().map_err(|_| ServeError::CoordinateOutOfRange {
        image_set: params.image_set.clone(),
        level: params.level,
        x: params.x,
        y: 0,
    })?;

    let artifact = state
        .service
        .serve_tile(&params.image_set, params.level, params.x, y)
        .await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        )
        .header("X-Tile-Width", artifact.width.to_string())
        .header("X-Tile-Height", artifact.height.to_string())
        .body(axum::body::Body::from(artifact.data))
        .unwrap();

    Ok(response)
}

/// Handle pyramid metadata requests.
///
/// # Endpoint
///
/// `GET /info/{image_set}`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "width": 7857,
///   "height": 7462,
///   "tileSize": 512,
///   "maxLevel": 4,
///   "tileSourceUrl": "http://localhost:8000/tiles/blue_fits"
/// }
/// ```
///
/// The tile source URL is derived from the `Host` and `X-Forwarded-Proto`
/// headers so the response works behind a reverse proxy.
///
/// # Errors
///
/// - `404 Not Found`: Unknown image set
/// - `502 Bad Gateway`: Storage backend unavailable
pub async fn image_info_handler(
    State(state): State<AppState>,
    Path(image_set): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ImageInfoResponse>, ServeError> {
    let config = state.service.serve_image_info(&image_set).await?;

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8000");

    // Detect protocol from X-Forwarded-Proto (for reverse proxy support)
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    Ok(Json(ImageInfoResponse {
        width: config.width,
        height: config.height,
        tile_size: config.tile_size,
        max_level: config.max_level,
        tile_source_url: format!("{}://{}/tiles/{}", proto, host, image_set),
    }))
}

/// Handle single tile-label requests.
///
/// # Endpoint
///
/// `GET /tile-label?file_path={artifact_path}`
///
/// # Response
///
/// - `200 OK`: `{"file_path": "...", "value": "..."}`
/// - `404 Not Found`: Tile has no stored label
/// - `502 Bad Gateway`: Label backend unavailable
/// - `503 Service Unavailable`: Label store not configured
pub async fn label_handler(
    State(state): State<AppState>,
    Query(query): Query<LabelQueryParams>,
) -> Result<Response, ServeError> {
    match state.service.serve_label(&query.file_path).await? {
        Some(value) => Ok(Json(LabelResponse {
            file_path: query.file_path,
            value,
        })
        .into_response()),
        None => {
            debug!(file_path = query.file_path.as_str(), "no label for tile");
            let body = ErrorResponse::with_status(
                "not_found",
                format!("No label for {}", query.file_path),
                StatusCode::NOT_FOUND,
            );
            Ok((StatusCode::NOT_FOUND, Json(body)).into_response())
        }
    }
}

/// Handle batch tile-label requests.
///
/// # Endpoint
///
/// `POST /batch-tile-labels` with body `{"file_paths": [...]}`
///
/// # Response
///
/// `200 OK` with a JSON object mapping each labeled path to its value;
/// unlabeled paths are absent. An empty request body yields an empty
/// object without consulting the label store at all.
///
/// When the backend is partially unreachable the response carries the
/// labels that were resolvable from cache plus `X-Labels-Degraded: true`.
///
/// # Errors
///
/// - `503 Service Unavailable`: Label store not configured
pub async fn batch_labels_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchLabelsRequest>,
) -> Result<Response, ServeError> {
    let batch = state.service.serve_labels(request.file_paths).await?;

    let mut response = Json(batch.labels).into_response();
    if batch.degraded {
        response
            .headers_mut()
            .insert("X-Labels-Degraded", header::HeaderValue::from_static("true"));
    }
    Ok(response)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("test_error", "Test message");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test_error"));
        assert!(json.contains("Test message"));
        assert!(!json.contains("status")); // status is None, should be skipped
    }

    #[test]
    fn test_error_response_with_status() {
        let response =
            ErrorResponse::with_status("not_found", "Tile not found", StatusCode::NOT_FOUND);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("404"));
    }

    #[test]
    fn test_serve_error_to_status_code() {
        // Unknown image set -> 404
        let err = ServeError::UnknownImageSet {
            image_set: "missing".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        // Coordinate outside the grid -> 404, not 400; grid shape is
        // internal
        let err = ServeError::CoordinateOutOfRange {
            image_set: "nebula".to_string(),
            level: 10,
            x: 0,
            y: 0,
        };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        // In-grid but absent -> 404
        let err = ServeError::TileNotFound {
            path: "nebula/4/0/0.png".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        // Backend unavailable -> 502
        let err = ServeError::Store(StoreError::Unavailable("timeout".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        // Corrupt metadata -> 500
        let err = ServeError::Store(StoreError::Corrupt {
            path: "nebula/config".to_string(),
            message: "bad json".to_string(),
        });
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        // Labels unconfigured -> 503
        let err = ServeError::Labels(LabelError::Unconfigured);
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        // Label backend down -> 502
        let err = ServeError::Labels(LabelError::Unavailable("down".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_coordinate_details_not_leaked() {
        let err = ServeError::CoordinateOutOfRange {
            image_set: "nebula".to_string(),
            level: 10,
            x: 3,
            y: 7,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        // Body is built from the generic message, so the handler never
        // reveals grid bounds; the typed error still carries them for logs
    }

    #[test]
    fn test_tile_path_params_y_parsing() {
        let params = TilePathParams {
            image_set: "nebula".to_string(),
            level: 2,
            x: 1,
            filename: "3.png".to_string(),
        };
        assert_eq!(params.y().unwrap(), 3);

        let params = TilePathParams {
            image_set: "nebula".to_string(),
            level: 2,
            x: 1,
            filename: "3".to_string(),
        };
        assert_eq!(params.y().unwrap(), 3);

        let params = TilePathParams {
            image_set: "nebula".to_string(),
            level: 2,
            x: 1,
            filename: "3.jpg".to_string(),
        };
        assert!(params.y().is_err());
    }

    #[test]
    fn test_image_info_response_field_names() {
        let response = ImageInfoResponse {
            width: 7857,
            height: 7462,
            tile_size: 512,
            max_level: 4,
            tile_source_url: "http://localhost:8000/tiles/nebula".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"tileSize\":512"));
        assert!(json.contains("\"maxLevel\":4"));
        assert!(json.contains("\"tileSourceUrl\""));
    }

    #[test]
    fn test_batch_request_missing_field_defaults_empty() {
        let request: BatchLabelsRequest = serde_json::from_str("{}").unwrap();
        assert!(request.file_paths.is_empty());
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }
}
