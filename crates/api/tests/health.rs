//! Integration tests for the health endpoints and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_check_returns_ok_with_json() {
    let h = common::spawn_app(1, 10, None);
    let response = get(&h.app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn engine_health_reports_each_dependency() {
    let h = common::spawn_app(1, 10, None);
    let response = get(&h.app, "/api/process/health").await;

    // Always 200; the body carries per-engine availability. Engines are
    // probed for real here, so only the shape is asserted.
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["status"] == "ok" || json["status"] == "degraded");
    assert!(json["engines"]["ffmpeg"].is_boolean());
    assert!(json["engines"]["whisper"].is_boolean());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_route_returns_404() {
    let h = common::spawn_app(1, 10, None);
    let response = get(&h.app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn response_contains_x_request_id_header() {
    let h = common::spawn_app(1, 10, None);
    let response = get(&h.app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a valid UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cors_preflight_returns_correct_headers() {
    let h = common::spawn_app(1, 10, None);

    // CORS preflight requires custom headers, so the request is built by hand.
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/process/stats")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173"),
    );
}
