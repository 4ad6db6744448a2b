//! Integration tests for health check and general API functionality.

use axum::http::StatusCode;

use super::common::{get, get_text, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state, _dir) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "driftwatch-api");
    assert_eq!(response["datasets"][0], "houses");
}

#[tokio::test]
async fn test_greeting() {
    let (app, _state, _dir) = test_app();

    let (status, body) = get_text(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello world from the metric server.");
}

#[tokio::test]
async fn test_no_metrics_before_first_evaluation() {
    let (app, _state, _dir) = test_app();

    let (status, body) = get_text(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}
