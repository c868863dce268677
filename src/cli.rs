//! Command-line interface for weatherbot
//!
//! Provides argument parsing and subcommand handling for the weatherbot binary.

use clap::{Parser, Subcommand};

/// Chat backend that answers weather questions with live data
#[derive(Parser)]
#[command(name = "weatherbot")]
#[command(version)]
#[command(about = "Chat backend that answers weather questions with live data")]
#[command(
    long_about = "Weatherbot serves a chat API. Each message is routed either to a language \
    model or to a live weather lookup, using keyword matching, model function calling, \
    or a tool-using agent loop."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Route a single message and print the reply without starting the server
    Ask {
        /// The message to send
        message: String,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Weatherbot Configuration
# =========================
#
# API keys are never stored here. Each section names the environment
# variable the key is read from at startup.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "127.0.0.1"

# Port to listen on
port = 8000

# Whole-request timeout in seconds (1-300)
request_timeout_seconds = 60

# ─────────────────────────────────────────────────────────────────────────────
# WEATHER API (OpenWeatherMap-compatible, metric units)
# ─────────────────────────────────────────────────────────────────────────────

[weather]
base_url = "https://api.openweathermap.org"
api_key_env = "WEATHER_API_KEY"

# Per-call timeout in seconds (1-60)
timeout_seconds = 10

# ─────────────────────────────────────────────────────────────────────────────
# CHAT COMPLETION API (OpenAI-compatible)
# ─────────────────────────────────────────────────────────────────────────────

[completion]
base_url = "https://integrate.api.nvidia.com/v1"
model = "nvidia/llama-3.1-nemotron-nano-8b-v1"
api_key_env = "NVIDIA_API_KEY"

# Sampling temperature (0.0-2.0)
temperature = 0.7

# Maximum tokens per reply
max_tokens = 500

# Per-call timeout in seconds (1-300)
timeout_seconds = 60

# ─────────────────────────────────────────────────────────────────────────────
# ROUTING CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[routing]
# Routing strategy:
#   - "keyword": keyword match plus regex city extraction (no model call for weather)
#   - "function_calling": the model decides via a get_weather tool
#   - "agent": tool-using loop, up to agent_max_steps model calls
strategy = "keyword"

# Iteration cap for the agent strategy (1-10)
agent_max_steps = 5

# Override the built-in weather keywords:
# weather_keywords = ["weather", "temperature", "rain"]

# Override the built-in city patterns. Each is matched against the lowercased
# message and needs exactly one capture group:
# city_patterns = ['weather in ([a-z\s]+)']

# ─────────────────────────────────────────────────────────────────────────────
# HISTORY
# ─────────────────────────────────────────────────────────────────────────────

[history]
# Number of exchanges kept in memory (oldest evicted first)
capacity = 1000

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
