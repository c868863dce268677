//! Intent routing for weatherbot
//!
//! Decides per message whether a weather lookup is needed and produces the
//! reply text. Three interchangeable strategies implement [`IntentRouter`];
//! [`build_router`] picks one from configuration.

pub mod agent;
pub mod extractor;
pub mod function_calling;
pub mod keyword;

pub use agent::AgentRouter;
pub use extractor::CityExtractor;
pub use function_calling::FunctionCallingRouter;
pub use keyword::{KeywordClassifier, KeywordRouter};

use crate::config::{Config, RoutingStrategy};
use crate::error::{AppResult, ChatError};
use crate::llm::{ChatModel, CompletionResult, ToolSpec};
use crate::weather::WeatherLookup;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Reply when a weather question names no recognisable city
pub const CLARIFICATION_PROMPT: &str =
    "Please specify a city name. For example: 'weather in London'";

/// System prompt for plain conversation
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful, friendly AI assistant.";

/// Name of the single tool exposed to the model
pub const WEATHER_TOOL_NAME: &str = "get_weather";

/// Argument carrying the city name
pub const WEATHER_TOOL_ARGUMENT: &str = "location";

/// Which side of the decision a message ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Weather data was looked up, or a city was asked for
    Weather,
    /// Answered by the model alone
    Chat,
}

impl Branch {
    /// Convert to string representation for logging and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Chat => "chat",
        }
    }
}

/// Outcome of routing one message
///
/// `text` is always populated; failures are already rendered as user-facing
/// sentences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReply {
    pub text: String,
    pub branch: Branch,
    pub strategy: RoutingStrategy,
}

impl RouteReply {
    pub fn new(text: impl Into<String>, branch: Branch, strategy: RoutingStrategy) -> Self {
        Self {
            text: text.into(),
            branch,
            strategy,
        }
    }
}

/// A routing strategy
///
/// Exactly one decision per message, no retries. Implementations never
/// return errors: every failure becomes reply text.
#[async_trait]
pub trait IntentRouter: Send + Sync {
    /// Route `message` and produce the reply
    async fn route(&self, message: &str) -> RouteReply;

    /// The strategy this router implements
    fn strategy(&self) -> RoutingStrategy;
}

/// Build the router selected by `config.routing.strategy`
///
/// # Errors
///
/// Returns [`crate::error::AppError::Config`] if the configured city
/// patterns do not compile.
pub fn build_router(
    config: &Config,
    weather: Arc<dyn WeatherLookup>,
    model: Arc<dyn ChatModel>,
) -> AppResult<Arc<dyn IntentRouter>> {
    let strategy = config.routing.strategy;
    tracing::info!(strategy = %strategy, "Building intent router");

    let router: Arc<dyn IntentRouter> = match strategy {
        RoutingStrategy::Keyword => {
            let classifier = KeywordClassifier::new(config.routing.weather_keywords());
            let patterns = config.routing.city_patterns();
            let extractor = CityExtractor::new(patterns.as_slice())?;
            Arc::new(KeywordRouter::new(classifier, extractor, weather, model))
        }
        RoutingStrategy::FunctionCalling => Arc::new(FunctionCallingRouter::new(weather, model)),
        RoutingStrategy::Agent => Arc::new(AgentRouter::new(
            weather,
            model,
            config.routing.agent_max_steps(),
        )),
    };

    Ok(router)
}

/// Declaration of the weather tool offered to the model
pub fn weather_tool_spec() -> ToolSpec {
    ToolSpec::function(
        WEATHER_TOOL_NAME,
        "Get the current weather for a city. Use only when the user asks about \
         weather conditions in a specific named place.",
    )
    .with_required_string(
        WEATHER_TOOL_ARGUMENT,
        "The city name, e.g. 'London' or 'New York'",
    )
}

/// Plain chat completion with the generic system prompt
///
/// Completion failures are rendered as their user-facing sentence.
pub(crate) async fn chat_reply(model: &dyn ChatModel, message: &str) -> String {
    match model.complete(CHAT_SYSTEM_PROMPT, message, None, None).await {
        Ok(CompletionResult::Text(text)) => text,
        // No tools were offered; treat a stray tool call as an empty answer
        Ok(CompletionResult::ToolCall(call)) => {
            tracing::warn!(tool = %call.tool_name, "Model requested a tool that was not offered");
            String::new()
        }
        Err(e) => {
            let err = ChatError::from(e);
            tracing::warn!(kind = err.kind(), error = %err, "Chat completion failed");
            err.to_string()
        }
    }
}
