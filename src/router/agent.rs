//! Agent routing strategy
//!
//! Registers the weather lookup as a tool on a generic [`Agent`] and lets
//! the loop decide when to call it. Useful for models that chain several
//! lookups or want to retry with a corrected city name.

use super::{
    Branch, IntentRouter, RouteReply, WEATHER_TOOL_ARGUMENT, WEATHER_TOOL_NAME, weather_tool_spec,
};
use crate::agent::{Agent, Tool, ToolExecutionError};
use crate::config::RoutingStrategy;
use crate::error::ChatError;
use crate::llm::ChatModel;
use crate::weather::WeatherLookup;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// System prompt for the agent loop
pub const AGENT_SYSTEM_PROMPT: &str = "You are a helpful, friendly AI assistant. You can call \
tools to gather information before answering. Use get_weather only for questions about the \
current weather in a named place. When you have what you need, answer the user directly \
without calling any more tools.";

/// Wrap a weather lookup as an agent tool
pub fn weather_tool(weather: Arc<dyn WeatherLookup>) -> Tool {
    Tool::new(
        weather_tool_spec(),
        Arc::new(move |args: BTreeMap<String, String>| {
            let weather = Arc::clone(&weather);
            async move {
                let Some(city) = args.get(WEATHER_TOOL_ARGUMENT).map(|c| c.trim().to_string()) else {
                    return Err(ToolExecutionError::MissingArgument(
                        WEATHER_TOOL_ARGUMENT.to_string(),
                    ));
                };
                Ok(weather.fetch_text(&city).await)
            }
            .boxed()
        }),
    )
}

/// Router backed by the tool-using agent loop
pub struct AgentRouter {
    agent: Agent,
}

impl AgentRouter {
    pub fn new(weather: Arc<dyn WeatherLookup>, model: Arc<dyn ChatModel>, max_steps: usize) -> Self {
        let agent = Agent::new(model, AGENT_SYSTEM_PROMPT, max_steps).with_tool(weather_tool(weather));
        Self { agent }
    }
}

#[async_trait]
impl IntentRouter for AgentRouter {
    async fn route(&self, message: &str) -> RouteReply {
        let strategy = RoutingStrategy::Agent;

        match self.agent.run(message).await {
            Ok(outcome) => {
                let branch = if outcome.used_tool(WEATHER_TOOL_NAME) {
                    Branch::Weather
                } else {
                    Branch::Chat
                };
                tracing::info!(
                    branch = branch.as_str(),
                    steps = outcome.steps,
                    tool_calls = outcome.observations.len(),
                    exhausted = outcome.exhausted,
                    "Agent run complete"
                );

                // An empty final answer after a lookup still has something to show
                let text = match outcome.observations.last() {
                    Some(last) if outcome.answer.trim().is_empty() => last.output.clone(),
                    _ => outcome.answer,
                };
                RouteReply::new(text, branch, strategy)
            }
            Err(e) => {
                let err = ChatError::from(e);
                tracing::warn!(kind = err.kind(), error = %err, "Agent run failed");
                RouteReply::new(err.to_string(), Branch::Chat, strategy)
            }
        }
    }

    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::Agent
    }
}
