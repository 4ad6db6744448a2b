//! API route definitions.
//!
//! This module organizes all HTTP routes for the Driftwatch API server.

mod health;
mod iterate;
mod metrics;

pub use health::health_routes;
pub use iterate::iterate_routes;
pub use metrics::metrics_routes;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error type.
    pub error: String,
    /// Detailed error message.
    pub message: String,
}

impl ApiError {
    /// Builds an error response with the given status.
    pub fn response(
        status: StatusCode,
        error: &str,
        message: impl Into<String>,
    ) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                error: error.to_string(),
                message: message.into(),
            }),
        )
    }
}
