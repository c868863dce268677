//! Error types for weatherbot
//!
//! [`AppError`] covers the HTTP and configuration layers and implements
//! `IntoResponse` for Axum handlers. [`ChatError`] is the user-facing
//! taxonomy for completion failures: every variant renders as the exact
//! sentence returned to the chat client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::llm::CompletionError;

/// Maximum number of characters of raw error detail included in a reply
pub const MAX_ERROR_DETAIL_CHARS: usize = 150;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": "error",
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Failures on the language-model side of a chat turn
///
/// The `Display` output of each variant is the reply shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("⚠️ Completion API key not found. Please set {variable}.")]
    MissingCredential { variable: String },

    #[error("❌ API Key Error: Your completion API key is invalid.")]
    ModelAuth,

    #[error("❌ Model not found. Please check the model name.")]
    ModelNotFound,

    #[error("❌ Too many requests! Please wait 30 seconds and try again.")]
    ModelRateLimited,

    #[error("❌ Request timed out. Please try a shorter message.")]
    ModelTimeout,

    #[error(
        "❌ Error: {}. Please check your API key and internet connection.",
        truncate_chars(.0, MAX_ERROR_DETAIL_CHARS)
    )]
    ModelUnknown(String),
}

impl ChatError {
    /// Classify a free-form error description into the taxonomy
    ///
    /// Used for failures that carry no HTTP status (transport or decode
    /// errors). Checks run in a fixed order on the lowercased text.
    pub fn classify_detail(detail: &str) -> Self {
        let lowered = detail.to_lowercase();

        if lowered.contains("401") || lowered.contains("unauthorized") {
            Self::ModelAuth
        } else if lowered.contains("404") || lowered.contains("not found") {
            Self::ModelNotFound
        } else if lowered.contains("rate limit") || lowered.contains("429") {
            Self::ModelRateLimited
        } else if lowered.contains("timeout") || lowered.contains("timed out") {
            Self::ModelTimeout
        } else {
            Self::ModelUnknown(detail.to_string())
        }
    }

    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } => "missing_credential",
            Self::ModelAuth => "auth",
            Self::ModelNotFound => "not_found",
            Self::ModelRateLimited => "rate_limited",
            Self::ModelTimeout => "timeout",
            Self::ModelUnknown(_) => "unknown",
        }
    }
}

impl From<CompletionError> for ChatError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::MissingCredential { variable } => Self::MissingCredential { variable },
            CompletionError::Unauthorized { .. } => Self::ModelAuth,
            CompletionError::ModelNotFound { .. } => Self::ModelNotFound,
            CompletionError::RateLimited => Self::ModelRateLimited,
            CompletionError::Timeout { .. } => Self::ModelTimeout,
            CompletionError::Status { status, body } => {
                Self::classify_detail(&format!("status {}: {}", status, body))
            }
            CompletionError::Transport(detail) | CompletionError::InvalidResponse(detail) => {
                Self::classify_detail(&detail)
            }
        }
    }
}

/// Take at most `max` characters from `text`, respecting UTF-8 boundaries
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
