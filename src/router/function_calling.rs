//! Function-calling routing strategy
//!
//! The model itself decides whether the weather tool is needed. One call
//! offers the `get_weather` declaration; if the model invokes it, the lookup
//! result goes back in a second call and the model phrases the final answer.

use super::{
    Branch, CLARIFICATION_PROMPT, IntentRouter, RouteReply, WEATHER_TOOL_ARGUMENT,
    WEATHER_TOOL_NAME, chat_reply, weather_tool_spec,
};
use crate::config::RoutingStrategy;
use crate::error::ChatError;
use crate::llm::{ChatModel, CompletionResult, ToolSpec};
use crate::weather::WeatherLookup;
use async_trait::async_trait;
use std::sync::Arc;

/// System prompt for the tool-offering call
pub const FUNCTION_CALLING_SYSTEM_PROMPT: &str = "You are a helpful, friendly AI assistant \
with access to a get_weather tool. Call get_weather only when the user's message contains \
both a weather-related term and a specific city or place name. Never call it for greetings, \
small talk, or questions you can answer without live weather data. When you receive weather \
data, summarise it naturally for the user.";

/// Router that lets the model request the weather tool
pub struct FunctionCallingRouter {
    weather: Arc<dyn WeatherLookup>,
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolSpec>,
}

impl FunctionCallingRouter {
    pub fn new(weather: Arc<dyn WeatherLookup>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            weather,
            model,
            tools: vec![weather_tool_spec()],
        }
    }

    fn reply(text: impl Into<String>, branch: Branch) -> RouteReply {
        RouteReply::new(text, branch, RoutingStrategy::FunctionCalling)
    }
}

#[async_trait]
impl IntentRouter for FunctionCallingRouter {
    async fn route(&self, message: &str) -> RouteReply {
        let first = self
            .model
            .complete(
                FUNCTION_CALLING_SYSTEM_PROMPT,
                message,
                Some(self.tools.as_slice()),
                None,
            )
            .await;

        let call = match first {
            Ok(CompletionResult::Text(text)) => {
                tracing::debug!(branch = "chat", "Model answered without tool call");
                return Self::reply(text, Branch::Chat);
            }
            Ok(CompletionResult::ToolCall(call)) => call,
            Err(e) => {
                let err = ChatError::from(e);
                tracing::warn!(kind = err.kind(), error = %err, "Tool-offering completion failed");
                return Self::reply(err.to_string(), Branch::Chat);
            }
        };

        if call.tool_name != WEATHER_TOOL_NAME {
            tracing::warn!(
                tool = %call.tool_name,
                "Model requested an unknown tool, answering without tools"
            );
            let text = chat_reply(self.model.as_ref(), message).await;
            return Self::reply(text, Branch::Chat);
        }

        let Some(city) = call
            .argument(WEATHER_TOOL_ARGUMENT)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
        else {
            tracing::info!(tool_call_id = %call.id, "Weather tool call without a location");
            return Self::reply(CLARIFICATION_PROMPT, Branch::Weather);
        };

        tracing::info!(city = %city, tool_call_id = %call.id, branch = "weather", "Model requested weather lookup");
        let weather_text = self.weather.fetch_text(&city).await;

        let second = self
            .model
            .complete(
                FUNCTION_CALLING_SYSTEM_PROMPT,
                message,
                Some(self.tools.as_slice()),
                Some((call, weather_text.clone())),
            )
            .await;

        let text = match second {
            Ok(CompletionResult::Text(text)) if !text.trim().is_empty() => text,
            Ok(CompletionResult::Text(_)) => {
                tracing::debug!("Follow-up completion was empty, returning weather text");
                weather_text
            }
            Ok(CompletionResult::ToolCall(again)) => {
                tracing::warn!(
                    tool = %again.tool_name,
                    "Model requested another tool call, returning weather text"
                );
                weather_text
            }
            Err(e) => {
                let err = ChatError::from(e);
                tracing::warn!(
                    kind = err.kind(),
                    error = %err,
                    "Follow-up completion failed, returning weather text"
                );
                weather_text
            }
        };

        Self::reply(text, Branch::Weather)
    }

    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::FunctionCalling
    }
}
