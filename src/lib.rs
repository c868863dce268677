//! Weatherbot - conversational backend with live weather lookups
//!
//! Each chat message is routed either to an OpenAI-compatible language model
//! or to a weather lookup. Three routing strategies are available: keyword
//! matching with regex city extraction, model function calling, and a
//! tool-using agent loop.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod llm;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod telemetry;
pub mod weather;
