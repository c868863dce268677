//! Chat endpoint handler
//!
//! Handles POST /api/chat: validates the message, routes it through the
//! configured strategy, and records the exchange.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::history::ChatExchange;
use crate::middleware::RequestId;
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Maximum allowed message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Chat request from client
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// A missing field is treated like an empty message
    #[serde(default)]
    pub message: String,
}

/// Successful chat reply
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub status: &'static str,
}

impl ChatResponse {
    pub fn success(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            status: "success",
        }
    }
}

/// Trim and bound the incoming message
fn validate_message(raw: &str) -> AppResult<&str> {
    let message = raw.trim();
    if message.is_empty() {
        return Err(AppError::Validation("Please enter a message".to_string()));
    }

    let char_count = message.chars().count();
    if char_count > MAX_MESSAGE_LENGTH {
        return Err(AppError::Validation(format!(
            "Message exceeds maximum length of {} characters (got {})",
            MAX_MESSAGE_LENGTH, char_count
        )));
    }

    Ok(message)
}

/// Chat handler
///
/// Routing never fails: upstream problems are already rendered into the
/// reply text, so the only error responses are validation failures (400).
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(
            request_id = %request_id,
            error = %rejection,
            "Rejected chat request body"
        );
        AppError::Validation("Invalid JSON format".to_string())
    })?;

    let message = validate_message(&request.message)?;

    tracing::debug!(
        request_id = %request_id,
        message_length = message.chars().count(),
        "Received chat request"
    );

    let routing_start = Instant::now();
    let reply = state.router().route(message).await;
    let routing_duration_ms = routing_start.elapsed().as_secs_f64() * 1000.0;

    tracing::info!(
        request_id = %request_id,
        strategy = reply.strategy.as_str(),
        branch = reply.branch.as_str(),
        elapsed_ms = routing_duration_ms,
        "Message routed"
    );

    let metrics = state.metrics();
    metrics.observe_failure(
        "record_request",
        metrics.record_request(reply.strategy, reply.branch),
    );
    metrics.observe_failure(
        "record_routing_duration",
        metrics.record_routing_duration(reply.strategy, routing_duration_ms),
    );

    let exchange = ChatExchange::new(message, reply.text.as_str(), request_id.to_string());
    if let Err(e) = state.history().record(exchange).await {
        tracing::error!(
            request_id = %request_id,
            error = %e,
            "Failed to record chat exchange, returning reply anyway"
        );
    }

    Ok(Json(ChatResponse::success(reply.text)))
}
