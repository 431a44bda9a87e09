//! Integration tests for the label endpoints.
//!
//! Tests verify:
//! - Single and batch label lookups over HTTP
//! - Empty batch requests never reach the backend
//! - Degraded responses when the label backend is down
//! - 503 when no label store is configured

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{seeded_router, seeded_router_with_labels, CountingBackend};

// =============================================================================
// Single Label Lookup
// =============================================================================

#[tokio::test]
async fn test_label_lookup_found() {
    let backend = CountingBackend::new(&[("galaxy/2/0/0.png", "spiral_arm")]);
    let router = seeded_router_with_labels("galaxy", backend).await;

    let request = Request::builder()
        .uri("/tile-label?file_path=galaxy/2/0/0.png")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["file_path"], "galaxy/2/0/0.png");
    assert_eq!(json["value"], "spiral_arm");
}

#[tokio::test]
async fn test_label_lookup_missing_returns_404() {
    let backend = CountingBackend::new(&[]);
    let router = seeded_router_with_labels("galaxy", backend).await;

    let request = Request::builder()
        .uri("/tile-label?file_path=galaxy/2/0/0.png")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Batch Label Lookup
// =============================================================================

#[tokio::test]
async fn test_batch_labels() {
    let backend = CountingBackend::new(&[
        ("galaxy/2/0/0.png", "spiral_arm"),
        ("galaxy/2/1/0.png", "star_field"),
    ]);
    let router = seeded_router_with_labels("galaxy", backend.clone()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/batch-tile-labels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"file_paths": ["galaxy/2/0/0.png", "galaxy/2/1/0.png", "galaxy/2/2/0.png"]}"#,
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-labels-degraded"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["galaxy/2/0/0.png"], "spiral_arm");
    assert_eq!(json["galaxy/2/1/0.png"], "star_field");
    // Unlabeled paths are absent, never null
    assert!(json.get("galaxy/2/2/0.png").is_none());

    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_empty_batch_returns_empty_object_without_backend_call() {
    let backend = CountingBackend::new(&[("galaxy/2/0/0.png", "spiral_arm")]);
    let router = seeded_router_with_labels("galaxy", backend.clone()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/batch-tile-labels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file_paths": []}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"{}");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_degraded_batch_sets_header() {
    let backend = CountingBackend::new(&[("galaxy/2/0/0.png", "spiral_arm")]);
    let router = seeded_router_with_labels("galaxy", backend.clone()).await;

    // Warm the cache with one key, then take the backend down
    let warm = Request::builder()
        .method("POST")
        .uri("/batch-tile-labels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file_paths": ["galaxy/2/0/0.png"]}"#))
        .unwrap();
    let response = router.clone().oneshot(warm).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    backend.set_down(true);

    let request = Request::builder()
        .method("POST")
        .uri("/batch-tile-labels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"file_paths": ["galaxy/2/0/0.png", "galaxy/2/1/0.png"]}"#,
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-labels-degraded").unwrap(),
        "true"
    );

    // The fresh cache hit is still served
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["galaxy/2/0/0.png"], "spiral_arm");
    assert!(json.get("galaxy/2/1/0.png").is_none());
}

// =============================================================================
// Unconfigured Label Store
// =============================================================================

#[tokio::test]
async fn test_label_endpoints_unconfigured_return_503() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .uri("/tile-label?file_path=galaxy/2/0/0.png")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let request = Request::builder()
        .method("POST")
        .uri("/batch-tile-labels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file_paths": ["galaxy/2/0/0.png"]}"#))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Tile serving is unaffected by the missing label store
    let request = Request::builder()
        .uri("/tiles/galaxy/2/0/0.png")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_batch_ok_even_when_unconfigured() {
    let router = seeded_router("galaxy").await;

    let request = Request::builder()
        .method("POST")
        .uri("/batch-tile-labels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file_paths": []}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"{}");
}
