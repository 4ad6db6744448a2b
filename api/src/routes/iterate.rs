//! Row ingestion endpoint.
//!
//! Feeds production rows into a dataset's window and triggers evaluation when the
//! window is full and the dataset's cooldown has elapsed.

use super::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::monitoring::{MonitoringError, TriggerDecision};

/// Request body: a batch of rows or a single row.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IterateRequest {
    /// A batch of rows; elements that are not objects are dropped.
    Batch(Vec<Value>),
    /// A single row.
    Single(Map<String, Value>),
}

impl IterateRequest {
    fn is_empty(&self) -> bool {
        matches!(self, Self::Batch(rows) if rows.is_empty())
    }

    /// Splits the body into object rows and the number of other elements.
    fn into_rows(self) -> (Vec<Map<String, Value>>, usize) {
        match self {
            Self::Batch(elements) => {
                let total = elements.len();
                let rows: Vec<Map<String, Value>> = elements
                    .into_iter()
                    .filter_map(|element| match element {
                        Value::Object(row) => Some(row),
                        _ => None,
                    })
                    .collect();
                let malformed = total - rows.len();
                (rows, malformed)
            }
            Self::Single(row) => (vec![row], 0),
        }
    }
}

/// Response for accepted rows.
#[derive(Debug, Serialize)]
pub struct IterateResponse {
    /// Rows appended to the window.
    pub accepted: usize,
    /// Rows dropped because they held none of the monitored features.
    pub dropped: usize,
    /// Window length after the batch.
    pub window_len: usize,
    /// Configured window size.
    pub window_size: usize,
    /// Whether an evaluation ran.
    pub evaluated: bool,
    /// Trigger decision taken after the batch.
    pub decision: TriggerDecision,
}

/// Creates the ingestion routes.
pub fn iterate_routes(state: AppState) -> Router {
    Router::new()
        .route("/iterate/{dataset}", post(iterate))
        .with_state(state)
}

/// Handler for row ingestion.
///
/// Returns 404 for unregistered datasets and 400 for bodies that are not JSON
/// objects or arrays, or are empty arrays. Array elements that are not objects
/// are dropped and counted.
async fn iterate(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    payload: Result<Json<IterateRequest>, JsonRejection>,
) -> Result<Json<IterateResponse>, (StatusCode, Json<ApiError>)> {
    if !state.service().is_registered(&dataset) {
        tracing::warn!(dataset = %dataset, "Rows received for an unregistered dataset");
        return Err(ApiError::response(
            StatusCode::NOT_FOUND,
            "unknown_dataset",
            format!("Dataset '{dataset}' is not registered"),
        ));
    }

    let Json(request) = payload.map_err(|rejection| {
        ApiError::response(
            StatusCode::BAD_REQUEST,
            "invalid_json",
            rejection.body_text(),
        )
    })?;

    if request.is_empty() {
        return Err(ApiError::response(
            StatusCode::BAD_REQUEST,
            "empty_batch",
            "At least one row is required",
        ));
    }

    let (rows, malformed) = request.into_rows();
    if malformed > 0 {
        tracing::warn!(
            dataset = %dataset,
            malformed,
            "Batch elements are not JSON objects, dropping them"
        );
    }

    let service = state.service_handle();
    let outcome = tokio::task::spawn_blocking(move || service.iterate(&dataset, &rows))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Ingestion task failed");
            ApiError::response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Ingestion task failed",
            )
        })?
        .map_err(|e| match e {
            MonitoringError::UnknownDataset(_) => {
                ApiError::response(StatusCode::NOT_FOUND, "unknown_dataset", e.to_string())
            }
            other => {
                tracing::error!(error = %other, "Failed to ingest rows");
                ApiError::response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    other.to_string(),
                )
            }
        })?;

    Ok(Json(IterateResponse {
        accepted: outcome.accepted,
        dropped: outcome.dropped + malformed,
        window_len: outcome.window_len,
        window_size: outcome.window_size,
        evaluated: outcome.evaluated(),
        decision: outcome.decision,
    }))
}
