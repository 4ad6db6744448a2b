//! Integration tests for row ingestion.
//!
//! Tests cover:
//! - Window filling and eviction
//! - Evaluation throttling
//! - Unknown datasets and malformed bodies

use axum::http::StatusCode;
use serde_json::json;

use super::common::{post_json, test_app};

#[tokio::test]
async fn test_window_fills_then_evaluates_once() {
    let (app, _state, _dir) = test_app();

    for i in 1..5 {
        let row = json!([{"price": 221_900, "bedrooms": 3, "condition": 3, "date": "20141013T000000"}]);
        let (status, response) = post_json(app.clone(), "/iterate/houses", row).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["window_len"], i);
        assert_eq!(response["evaluated"], false);
    }

    let row = json!([{"price": 538_000, "bedrooms": 2, "condition": 4}]);
    let (status, response) = post_json(app.clone(), "/iterate/houses", row.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["window_len"], 5);
    assert_eq!(response["evaluated"], true);

    // The calculation period is 60 seconds.
    let (status, response) = post_json(app, "/iterate/houses", row).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["window_len"], 5);
    assert_eq!(response["evaluated"], false);
    assert_eq!(response["decision"]["status"], "cooling_down");
}

#[tokio::test]
async fn test_batch_is_trimmed_to_window_size() {
    let (app, _state, _dir) = test_app();

    let rows: Vec<_> = (0..8)
        .map(|i| json!({"bedrooms": i % 4 + 1, "condition": 3}))
        .collect();
    let (status, response) = post_json(app, "/iterate/houses", json!(rows)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["accepted"], 8);
    assert_eq!(response["window_len"], 5);
    assert_eq!(response["window_size"], 5);
    assert_eq!(response["evaluated"], true);
}

#[tokio::test]
async fn test_unknown_dataset_is_rejected() {
    let (app, state, _dir) = test_app();

    let (status, response) =
        post_json(app, "/iterate/flats", json!([{"bedrooms": 3, "condition": 3}])).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "unknown_dataset");
    assert_eq!(state.service().dataset_names(), vec!["houses"]);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let (app, _state, _dir) = test_app();

    let (status, response) = post_json(app, "/iterate/houses", json!([])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "empty_batch");
}

#[tokio::test]
async fn test_row_without_features_is_dropped() {
    let (app, _state, _dir) = test_app();

    let (status, response) =
        post_json(app, "/iterate/houses", json!([{"price": 1, "date": "x"}])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["accepted"], 0);
    assert_eq!(response["dropped"], 1);
    assert_eq!(response["window_len"], 0);
}
