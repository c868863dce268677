//! Health check endpoint
//!
//! Liveness only: upstream APIs are not probed.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Health check handler
pub async fn handler() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            message: "API is running",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
