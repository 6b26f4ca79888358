mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;

#[tokio::test]
async fn health_reports_ok_when_dependencies_respond() {
    let app = TestApp::spawn();

    let response = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["service"], "shop-accounting-service");
}

#[tokio::test]
async fn readiness_is_ok() {
    let app = TestApp::spawn();

    let response = app.request(Method::GET, "/ready", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_endpoint_serves_text() {
    let app = TestApp::spawn();

    let response = app.request(Method::GET, "/metrics", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn request_metrics_are_exported_by_route() {
    let app = TestApp::spawn();
    app.request(Method::GET, "/health", None, None).await;

    let response = app.request(Method::GET, "/metrics", None, None).await;

    let body = response.body.as_str().unwrap();
    assert!(body.contains("http_requests_total"));
    assert!(body.contains("http_request_duration_seconds"));
    assert!(body.contains(r#"path="/health""#));
}

#[tokio::test]
async fn responses_carry_request_id_and_hardening_headers() {
    let app = TestApp::spawn();

    let response = app.request(Method::GET, "/health", None, None).await;

    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
}
