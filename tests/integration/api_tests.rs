//! API integration tests for tile retrieval and error handling.
//!
//! Tests verify:
//! - Tile retrieval for generated pyramids
//! - Error cases (unknown image set, out-of-grid coordinates, missing
//!   artifacts)
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{is_valid_png, seeded_router};

// =============================================================================
// Basic Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_retrieval_success() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .uri("/tiles/galaxy/2/0/0.png")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );
    assert!(response.headers().contains_key("cache-control"));
    assert_eq!(response.headers().get("x-tile-width").unwrap(), "16");
    assert_eq!(response.headers().get("x-tile-height").unwrap(), "16");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_png(&body), "Response should be a valid PNG");
}

#[tokio::test]
async fn test_tile_retrieval_without_extension() {
    let router = seeded_router("galaxy").await;

    // The y segment works with or without the .png suffix
    let request = Request::builder()
        .uri("/tiles/galaxy/2/0/0")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_edge_tile_has_clipped_dimensions() {
    let router = seeded_router("galaxy").await;

    // Native level is 40x24: tile (2, 1) is the 8x8 corner
    let request = Request::builder()
        .uri("/tiles/galaxy/2/2/1.png")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tile-width").unwrap(), "8");
    assert_eq!(response.headers().get("x-tile-height").unwrap(), "8");
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_unknown_image_set_returns_404() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .uri("/tiles/missing/0/0/0.png")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_out_of_grid_coordinate_returns_404() {
    let router = seeded_router("galaxy").await;

    // Max level is 2
    let request = Request::builder()
        .uri("/tiles/galaxy/10/0/0.png")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The body reveals nothing about the grid shape
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Tile not found");
}

#[tokio::test]
async fn test_x_coordinate_outside_grid_returns_404() {
    let router = seeded_router("galaxy").await;

    // Native grid is 3 columns wide (x in 0..=2)
    let request = Request::builder()
        .uri("/tiles/galaxy/2/9/0.png")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unparseable_y_returns_404() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .uri("/tiles/galaxy/2/0/zero.png")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Pyramid Metadata
// =============================================================================

#[tokio::test]
async fn test_image_info_response() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .uri("/info/galaxy")
        .header("host", "tiles.example.org")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["width"], 40);
    assert_eq!(json["height"], 24);
    assert_eq!(json["tileSize"], 16);
    assert_eq!(json["maxLevel"], 2);
    assert_eq!(
        json["tileSourceUrl"],
        "http://tiles.example.org/tiles/galaxy"
    );
}

#[tokio::test]
async fn test_image_info_respects_forwarded_proto() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .uri("/info/galaxy")
        .header("host", "tiles.example.org")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json["tileSourceUrl"],
        "https://tiles.example.org/tiles/galaxy"
    );
}

#[tokio::test]
async fn test_image_info_unknown_set_returns_404() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .uri("/info/missing")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}
