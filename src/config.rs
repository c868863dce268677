//! Configuration management for weatherbot
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every section is optional; omitted sections and fields take the defaults
//! documented on each type.

use crate::error::{AppError, AppResult};
use crate::router::extractor::{CityExtractor, DEFAULT_CITY_PATTERNS};
use crate::router::keyword::DEFAULT_WEATHER_KEYWORDS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Upper bound shared by the server request timeout and the model timeout
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Upper bound for weather lookups
const MAX_WEATHER_TIMEOUT_SECONDS: u64 = 60;

/// Upper bound for agent iterations
const MAX_AGENT_STEPS: usize = 10;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    60
}

/// Weather API settings
///
/// Fields are private; values are checked by [`Config::validate`] and read
/// through accessors. Units are always metric.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_base_url")]
    base_url: String,
    #[serde(default = "default_weather_key_env")]
    api_key_env: String,
    #[serde(default = "default_weather_timeout")]
    timeout_seconds: u64,
}

impl WeatherConfig {
    /// Base URL without the `/data/2.5` path
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Name of the environment variable holding the API key
    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            api_key_env: default_weather_key_env(),
            timeout_seconds: default_weather_timeout(),
        }
    }
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_weather_key_env() -> String {
    "WEATHER_API_KEY".to_string()
}

fn default_weather_timeout() -> u64 {
    10
}

/// Chat-completion service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_base_url")]
    base_url: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_completion_key_env")]
    api_key_env: String,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_completion_timeout")]
    timeout_seconds: u64,
}

impl CompletionConfig {
    /// Base URL including the `/v1` prefix
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Name of the environment variable holding the API key
    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            model: default_model(),
            api_key_env: default_completion_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_completion_timeout(),
        }
    }
}

fn default_completion_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".to_string()
}

fn default_model() -> String {
    "nvidia/llama-3.1-nemotron-nano-8b-v1".to_string()
}

fn default_completion_key_env() -> String {
    "NVIDIA_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_completion_timeout() -> u64 {
    60
}

/// Routing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub strategy: RoutingStrategy,
    /// Replaces the built-in keyword set when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weather_keywords: Option<Vec<String>>,
    /// Replaces the built-in city patterns when present
    ///
    /// Each pattern is matched against the lowercased message and must
    /// contain exactly one capture group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    city_patterns: Option<Vec<String>>,
    #[serde(default = "default_agent_max_steps")]
    agent_max_steps: usize,
}

impl RoutingConfig {
    /// Configured keywords, or the built-in set
    pub fn weather_keywords(&self) -> Vec<String> {
        match &self.weather_keywords {
            Some(keywords) => keywords.clone(),
            None => DEFAULT_WEATHER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Configured city patterns, or the built-in ordered list
    pub fn city_patterns(&self) -> Vec<String> {
        match &self.city_patterns {
            Some(patterns) => patterns.clone(),
            None => DEFAULT_CITY_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Iteration cap for the agent strategy
    pub fn agent_max_steps(&self) -> usize {
        self.agent_max_steps
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: RoutingStrategy::default(),
            weather_keywords: None,
            city_patterns: None,
            agent_max_steps: default_agent_max_steps(),
        }
    }
}

fn default_agent_max_steps() -> usize {
    5
}

/// Routing strategy enum
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Keyword heuristic plus regex city extraction
    #[default]
    Keyword,
    /// Model-native function calling with one weather tool
    FunctionCalling,
    /// Tool-using agent loop
    Agent,
}

impl RoutingStrategy {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::FunctionCalling => "function_calling",
            Self::Agent => "agent",
        }
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chat history retention
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

fn default_history_capacity() -> usize {
    1000
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// API keys resolved from the environment at startup
///
/// A missing key is kept as `None`; the affected client reports it on use
/// instead of refusing to start.
#[derive(Clone, Default)]
pub struct Credentials {
    pub weather_api_key: Option<String>,
    pub completion_api_key: Option<String>,
}

impl Credentials {
    /// Read both keys from the variables named in `config`
    pub fn from_env(config: &Config) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve keys through an arbitrary lookup; empty values count as unset
    pub fn from_lookup<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |name: &str| {
            let value = lookup(name).filter(|v| !v.trim().is_empty());
            if value.is_none() {
                tracing::warn!(variable = %name, "API key environment variable is not set");
            }
            value
        };

        Self {
            weather_api_key: resolve(config.weather.api_key_env()),
            completion_api_key: resolve(config.completion.api_key_env()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("weather_api_key", &mask(&self.weather_api_key))
            .field("completion_api_key", &mask(&self.completion_api_key))
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called automatically by `from_file()` and `from_str()`, and can be
    /// called again after mutating a config in tests.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.request_timeout_seconds == 0
            || self.server.request_timeout_seconds > MAX_TIMEOUT_SECONDS
        {
            return Err(AppError::Config(format!(
                "server.request_timeout_seconds must be between 1 and {}, got {}",
                MAX_TIMEOUT_SECONDS, self.server.request_timeout_seconds
            )));
        }

        validate_base_url("weather.base_url", &self.weather.base_url)?;
        validate_base_url("completion.base_url", &self.completion.base_url)?;

        if self.weather.timeout_seconds == 0
            || self.weather.timeout_seconds > MAX_WEATHER_TIMEOUT_SECONDS
        {
            return Err(AppError::Config(format!(
                "weather.timeout_seconds must be between 1 and {}, got {}",
                MAX_WEATHER_TIMEOUT_SECONDS, self.weather.timeout_seconds
            )));
        }

        if self.weather.api_key_env.trim().is_empty()
            || self.completion.api_key_env.trim().is_empty()
        {
            return Err(AppError::Config(
                "api_key_env must name an environment variable".to_string(),
            ));
        }

        if self.completion.model.trim().is_empty() {
            return Err(AppError::Config(
                "completion.model cannot be empty".to_string(),
            ));
        }

        // NaN fails both comparisons, so check finiteness explicitly
        if !self.completion.temperature.is_finite()
            || !(0.0..=2.0).contains(&self.completion.temperature)
        {
            return Err(AppError::Config(format!(
                "completion.temperature must be a finite number between 0.0 and 2.0, got {}",
                self.completion.temperature
            )));
        }

        if self.completion.max_tokens == 0 {
            return Err(AppError::Config(
                "completion.max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.completion.timeout_seconds == 0
            || self.completion.timeout_seconds > MAX_TIMEOUT_SECONDS
        {
            return Err(AppError::Config(format!(
                "completion.timeout_seconds must be between 1 and {}, got {}",
                MAX_TIMEOUT_SECONDS, self.completion.timeout_seconds
            )));
        }

        if let Some(keywords) = &self.routing.weather_keywords
            && (keywords.is_empty() || keywords.iter().any(|k| k.trim().is_empty()))
        {
            return Err(AppError::Config(
                "routing.weather_keywords must contain at least one non-empty keyword"
                    .to_string(),
            ));
        }

        if let Some(patterns) = &self.routing.city_patterns {
            if patterns.is_empty() {
                return Err(AppError::Config(
                    "routing.city_patterns cannot be empty".to_string(),
                ));
            }
            CityExtractor::new(patterns)?;
        }

        if self.routing.agent_max_steps == 0 || self.routing.agent_max_steps > MAX_AGENT_STEPS {
            return Err(AppError::Config(format!(
                "routing.agent_max_steps must be between 1 and {}, got {}",
                MAX_AGENT_STEPS, self.routing.agent_max_steps
            )));
        }

        if self.history.capacity == 0 {
            return Err(AppError::Config(
                "history.capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_base_url(field: &str, url: &str) -> AppResult<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::Config(format!(
            "{} '{}' is invalid. It must start with 'http://' or 'https://'.",
            field, url
        )));
    }
    Ok(())
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
