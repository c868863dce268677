//! Prometheus metrics collection for weatherbot
//!
//! This module provides metrics instrumentation for tracking:
//! - Request counts by routing strategy and branch
//! - Routing latency
//! - Weather lookup outcomes
//! - Completion failures by kind
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.
//! Weather and completion outcomes are recorded by the [`MeteredWeather`]
//! and [`MeteredModel`] wrappers, so routers stay unaware of metrics.

use crate::config::RoutingStrategy;
use crate::error::ChatError;
use crate::llm::{AssistantTurn, ChatMessage, ChatModel, CompletionError, ToolSpec};
use crate::router::Branch;
use crate::weather::{WeatherError, WeatherLookup, WeatherReport};
use async_trait::async_trait;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector for weatherbot
///
/// All label values come from enums, so cardinality is fixed:
/// 3 strategies × 2 branches for requests, 7 lookup outcomes,
/// 6 completion failure kinds.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    routing_duration: HistogramVec,
    weather_lookups: IntCounterVec,
    completion_failures: IntCounterVec,
    metrics_recording_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "weatherbot_requests_total",
                "Total number of chat requests by routing strategy and branch",
            ),
            &["strategy", "branch"],
        )?;

        // Model calls dominate; buckets reach well past the default model timeout
        let routing_duration = HistogramVec::new(
            HistogramOpts::new(
                "weatherbot_routing_duration_ms",
                "End-to-end routing latency in milliseconds",
            )
            .buckets(vec![
                1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
                30000.0, 60000.0,
            ]),
            &["strategy"],
        )?;

        let weather_lookups = IntCounterVec::new(
            Opts::new(
                "weatherbot_weather_lookups_total",
                "Total number of weather lookups by outcome",
            ),
            &["outcome"],
        )?;

        let completion_failures = IntCounterVec::new(
            Opts::new(
                "weatherbot_completion_failures_total",
                "Total number of failed completion calls by failure kind",
            ),
            &["kind"],
        )?;

        let metrics_recording_failures = IntCounterVec::new(
            Opts::new(
                "weatherbot_metrics_recording_failures_total",
                "Total number of metrics recording operation failures by operation. \
                Indicates Prometheus internal errors.",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(routing_duration.clone()))?;
        registry.register(Box::new(weather_lookups.clone()))?;
        registry.register(Box::new(completion_failures.clone()))?;
        registry.register(Box::new(metrics_recording_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            routing_duration,
            weather_lookups,
            completion_failures,
            metrics_recording_failures,
        })
    }

    /// Record a routed request
    ///
    /// # Errors
    ///
    /// Returns an error if the metric is not registered.
    pub fn record_request(
        &self,
        strategy: RoutingStrategy,
        branch: Branch,
    ) -> Result<(), prometheus::Error> {
        self.requests_total
            .get_metric_with_label_values(&[strategy.as_str(), branch.as_str()])?
            .inc();
        Ok(())
    }

    /// Record routing duration
    ///
    /// # Errors
    ///
    /// Returns an error if the metric is not registered, or if `duration_ms`
    /// is NaN, infinite, or negative. Such values would corrupt every
    /// percentile of the histogram.
    pub fn record_routing_duration(
        &self,
        strategy: RoutingStrategy,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }

        self.routing_duration
            .get_metric_with_label_values(&[strategy.as_str()])?
            .observe(duration_ms);
        Ok(())
    }

    /// Record the outcome of one weather lookup
    ///
    /// The label is `success` or the [`WeatherError::kind`] of the failure.
    pub fn record_weather_lookup(
        &self,
        outcome: Result<(), &WeatherError>,
    ) -> Result<(), prometheus::Error> {
        let label = match outcome {
            Ok(()) => "success",
            Err(e) => e.kind(),
        };
        self.weather_lookups
            .get_metric_with_label_values(&[label])?
            .inc();
        Ok(())
    }

    /// Record one failed completion call
    pub fn record_completion_failure(&self, error: &ChatError) -> Result<(), prometheus::Error> {
        self.completion_failures
            .get_metric_with_label_values(&[error.kind()])?
            .inc();
        Ok(())
    }

    /// Record a metrics recording operation failure
    ///
    /// Callers use this after logging the original error; it never fails.
    pub fn metrics_recording_failure(&self, operation: &str) {
        self.metrics_recording_failures
            .with_label_values(&[operation])
            .inc();
    }

    /// Log and count a failed recording
    pub fn observe_failure(&self, operation: &str, result: Result<(), prometheus::Error>) {
        if let Err(e) = result {
            tracing::warn!(operation, error = %e, "Failed to record metric");
            self.metrics_recording_failure(operation);
        }
    }

    /// Gather and encode all metrics in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or produces invalid UTF-8.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics output is not UTF-8: {}", e)))
    }
}

/// Weather lookup wrapper that counts outcomes
pub struct MeteredWeather {
    inner: Arc<dyn WeatherLookup>,
    metrics: Arc<Metrics>,
}

impl MeteredWeather {
    pub fn new(inner: Arc<dyn WeatherLookup>, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl WeatherLookup for MeteredWeather {
    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let result = self.inner.fetch(city).await;
        self.metrics.observe_failure(
            "record_weather_lookup",
            self.metrics
                .record_weather_lookup(result.as_ref().map(|_| ())),
        );
        result
    }
}

/// Chat model wrapper that counts failures
pub struct MeteredModel {
    inner: Arc<dyn ChatModel>,
    metrics: Arc<Metrics>,
}

impl MeteredModel {
    pub fn new(inner: Arc<dyn ChatModel>, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl ChatModel for MeteredModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> Result<AssistantTurn, CompletionError> {
        let result = self.inner.chat(messages, tools).await;
        if let Err(e) = &result {
            let classified = ChatError::from(e.clone());
            self.metrics.observe_failure(
                "record_completion_failure",
                self.metrics.record_completion_failure(&classified),
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::test_support::{FakeWeather, ScriptedModel, text};

    #[test]
    fn test_metrics_new_registers_all_families() {
        let metrics = Metrics::new().expect("should create metrics");
        metrics
            .record_request(RoutingStrategy::Keyword, Branch::Weather)
            .unwrap();
        metrics
            .record_routing_duration(RoutingStrategy::Keyword, 12.0)
            .unwrap();
        metrics.record_weather_lookup(Ok(())).unwrap();
        metrics
            .record_completion_failure(&ChatError::ModelTimeout)
            .unwrap();

        let output = metrics.gather().unwrap();
        assert!(output.contains("weatherbot_requests_total"));
        assert!(output.contains("strategy=\"keyword\""));
        assert!(output.contains("branch=\"weather\""));
        assert!(output.contains("weatherbot_routing_duration_ms"));
        assert!(output.contains("weatherbot_weather_lookups_total{outcome=\"success\"} 1"));
        assert!(output.contains("weatherbot_completion_failures_total{kind=\"timeout\"} 1"));
    }

    #[test]
    fn test_routing_duration_rejects_invalid_values() {
        let metrics = Metrics::new().unwrap();
        for bad in [f64::NAN, f64::INFINITY, -1.0] {
            assert!(
                metrics
                    .record_routing_duration(RoutingStrategy::Agent, bad)
                    .is_err()
            );
        }
    }

    #[test]
    fn test_observe_failure_counts_errors() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_failure("record_request", Err(prometheus::Error::Msg("x".into())));
        metrics.observe_failure("record_request", Ok(()));

        let output = metrics.gather().unwrap();
        assert!(output.contains(
            "weatherbot_metrics_recording_failures_total{operation=\"record_request\"} 1"
        ));
    }

    #[tokio::test]
    async fn test_metered_weather_counts_outcomes() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let ok = MeteredWeather::new(Arc::new(FakeWeather::sunny()), metrics.clone());
        let bad = MeteredWeather::new(
            Arc::new(FakeWeather::with(Err(WeatherError::Timeout))),
            metrics.clone(),
        );

        ok.fetch("Paris").await.unwrap();
        assert_eq!(bad.fetch_text("Paris").await, WeatherError::Timeout.to_string());

        let output = metrics.gather().unwrap();
        assert!(output.contains("weatherbot_weather_lookups_total{outcome=\"success\"} 1"));
        assert!(output.contains("weatherbot_weather_lookups_total{outcome=\"timeout\"} 1"));
    }

    #[tokio::test]
    async fn test_metered_model_counts_failures_only() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let model = MeteredModel::new(
            Arc::new(ScriptedModel::new(vec![
                text("fine"),
                Err(CompletionError::RateLimited),
            ])),
            metrics.clone(),
        );

        assert!(model.chat(&[], None).await.is_ok());
        assert!(model.chat(&[], None).await.is_err());

        let output = metrics.gather().unwrap();
        assert!(output.contains("weatherbot_completion_failures_total{kind=\"rate_limited\"} 1"));
    }
}
