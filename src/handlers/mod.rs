//! HTTP request handlers for the weatherbot API

use crate::config::{Config, Credentials};
use crate::error::{AppError, AppResult};
use crate::history::{ChatHistory, InMemoryHistory};
use crate::llm::{ChatModel, CompletionClient};
use crate::metrics::{MeteredModel, MeteredWeather, Metrics};
use crate::middleware::request_id_middleware;
use crate::router::{IntentRouter, build_router};
use crate::weather::{WeatherClient, WeatherLookup};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub mod chat;
pub mod health;
pub mod metrics;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    router: Arc<dyn IntentRouter>,
    history: Arc<dyn ChatHistory>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire the production collaborators from configuration
    ///
    /// Weather and completion clients are wrapped in their metered
    /// decorators before being handed to the router.
    ///
    /// # Errors
    ///
    /// Returns an error if metrics registration fails or the configured city
    /// patterns do not compile.
    pub fn new(config: Arc<Config>, credentials: &Credentials) -> AppResult<Self> {
        let metrics = Arc::new(Metrics::new().map_err(|e| {
            AppError::Internal(format!("Failed to initialize metrics: {}", e))
        })?);

        let weather: Arc<dyn WeatherLookup> = Arc::new(MeteredWeather::new(
            Arc::new(WeatherClient::new(
                &config.weather,
                credentials.weather_api_key.clone(),
            )),
            metrics.clone(),
        ));
        let model: Arc<dyn ChatModel> = Arc::new(MeteredModel::new(
            Arc::new(CompletionClient::new(
                &config.completion,
                credentials.completion_api_key.clone(),
            )),
            metrics.clone(),
        ));

        let router = build_router(&config, weather, model)?;
        let history = Arc::new(InMemoryHistory::new(config.history.capacity));

        Ok(Self {
            config,
            router,
            history,
            metrics,
        })
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: Arc<Config>,
        router: Arc<dyn IntentRouter>,
        history: Arc<dyn ChatHistory>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            router,
            history,
            metrics,
        }
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the intent router
    pub fn router(&self) -> &dyn IntentRouter {
        self.router.as_ref()
    }

    /// Get reference to the chat history store
    pub fn history(&self) -> &dyn ChatHistory {
        self.history.as_ref()
    }

    /// Get reference to the metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the HTTP application
///
/// Mounts `POST /api/chat`, `GET /api/health` and `GET /metrics`, with a
/// request id on every request, HTTP tracing spans, and a request timeout of
/// `server.request_timeout_seconds`.
pub fn app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config().server.request_timeout_seconds);

    Router::new()
        .route("/api/chat", post(chat::handler))
        .route("/api/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
}
