//! Health check endpoints.
//!
//! Provides the greeting at `/` and a JSON health check for load balancers.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Plain-text greeting served at `/`.
pub const GREETING: &str = "Hello world from the metric server.";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Registered datasets.
    pub datasets: Vec<String>,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn index() -> &'static str {
    GREETING
}

/// Health check handler.
///
/// Returns a simple JSON response indicating the service is healthy.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "driftwatch-api",
        version: env!("CARGO_PKG_VERSION"),
        datasets: state.service().dataset_names(),
    })
}
