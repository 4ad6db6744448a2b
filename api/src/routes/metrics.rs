//! Prometheus exposition endpoint.

use super::ApiError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

/// Creates the metrics routes.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(export_metrics))
        .with_state(state)
}

/// Renders every gauge of the monitoring service.
async fn export_metrics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let service = state.service();
    let body = service.gather_metrics().map_err(|e| {
        tracing::error!(error = %e, "Failed to encode metrics");
        ApiError::response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "encoding_error",
            e.to_string(),
        )
    })?;

    Ok((
        [(header::CONTENT_TYPE, service.registry().content_type())],
        body,
    ))
}
