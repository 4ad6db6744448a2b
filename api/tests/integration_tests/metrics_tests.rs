//! Integration tests for the Prometheus exposition endpoint.

use axum::http::StatusCode;
use serde_json::json;

use super::common::{get_text, post_json, test_app};

#[tokio::test]
async fn test_no_drift_against_matching_window() {
    let (app, _state, _dir) = test_app();

    let rows = json!([
        {"bedrooms": 3, "condition": 3},
        {"bedrooms": 3, "condition": 3},
        {"bedrooms": 2, "condition": 4},
        {"bedrooms": 4, "condition": 3},
        {"bedrooms": 3, "condition": 4}
    ]);
    let (status, response) = post_json(app.clone(), "/iterate/houses", rows).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["evaluated"], true);

    let (status, body) = get_text(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("# TYPE driftwatch:data_drift:dataset_drift gauge"));
    assert!(body.contains("driftwatch:data_drift:dataset_drift{dataset_name=\"houses\"} 0"));
    assert!(body.contains("driftwatch:data_drift:n_drifted_features{dataset_name=\"houses\"} 0"));
    assert!(body.contains("driftwatch:n_features{dataset_name=\"houses\"} 2"));
    assert!(body.contains(
        "driftwatch:data_drift:p_value{dataset_name=\"houses\",feature=\"bedrooms\",feature_type=\"num\"}"
    ));
    assert!(body.contains("driftwatch:reference_dataset_hash{dataset_name=\"houses\",hash=\""));
}

#[tokio::test]
async fn test_unseen_category_drifts() {
    let (app, state, _dir) = test_app();

    let rows: Vec<_> = (0..5)
        .map(|_| json!({"bedrooms": 9, "condition": 1}))
        .collect();
    let (status, response) = post_json(app.clone(), "/iterate/houses", json!(rows)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["evaluated"], true);

    let registry = state.service().registry();
    let no_labels = std::collections::BTreeMap::new();
    assert_eq!(
        registry.value("houses", "data_drift:dataset_drift", &no_labels),
        Some(1.0)
    );
    assert_eq!(
        registry.value("houses", "data_drift:n_drifted_features", &no_labels),
        Some(2.0)
    );

    let (_, body) = get_text(app, "/metrics").await;
    assert!(body.contains("driftwatch:data_drift:dataset_drift{dataset_name=\"houses\"} 1"));
}
