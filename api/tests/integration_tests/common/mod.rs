//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup from a temporary datasets directory and HTTP request
//! helpers.

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use shared::config::MonitoringConfig;
use tempfile::TempDir;

/// Reference sample of the `houses` dataset, semicolon separated.
pub const HOUSES_REFERENCE: &str = "\
price;bedrooms;condition;date
221900;3;3;20141013T000000
538000;3;3;20141209T000000
180000;2;3;20150225T000000
604000;4;5;20141209T000000
510000;3;3;20150218T000000
1230000;4;3;20140512T000000
257500;3;3;20140627T000000
291850;3;3;20150115T000000
229500;3;3;20150415T000000
323000;3;3;20150312T000000
662500;3;3;20150403T000000
468000;2;4;20140527T000000
310000;3;4;20140528T000000
400000;3;4;20141007T000000
530000;5;3;20150312T000000
650000;4;3;20150124T000000
395000;3;3;20140707T000000
485000;4;4;20140516T000000
189000;2;4;20150420T000000
230000;3;4;20150303T000000
";

/// Monitoring configuration template; `{datasets_path}` is substituted.
const CONFIG_TEMPLATE: &str = r#"
service:
  datasets_path: "{datasets_path}"
  use_reference: true
  moving_reference: false
  window_size: 5
  calculation_period_sec: 60
  data_drift:
    confidence: 0.95
    drift_share: 0.5
datasets:
  houses:
    column_mapping:
      target: price
      datetime: date
      numerical_features: [bedrooms]
      categorical_features: [condition]
    data_format:
      separator: ";"
      header: true
    monitors:
      - data_drift
"#;

/// Creates a test router backed by a temporary datasets directory.
///
/// # Returns
///
/// A tuple containing the configured router, the app state and the directory,
/// which must outlive the test.
pub fn test_app() -> (Router, AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let houses = dir.path().join("houses");
    std::fs::create_dir(&houses).unwrap();
    std::fs::write(houses.join("reference.csv"), HOUSES_REFERENCE).unwrap();

    let yaml = CONFIG_TEMPLATE.replace("{datasets_path}", &dir.path().display().to_string());
    let config = MonitoringConfig::from_yaml(&yaml).unwrap();

    let state = AppState::from_config(&config).unwrap();
    let router = create_router(state.clone());
    (router, state, dir)
}

/// Helper to make a POST request with JSON body.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a GET request.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, text) = get_text(app, uri).await;
    let json: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    (status, json)
}

/// Helper to make a GET request returning the raw body.
pub async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, String::from_utf8(body_bytes.to_vec()).unwrap())
}
