//! Chat-completion client and wire types
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol, which the
//! hosted NVIDIA endpoints (and most self-hosted servers) expose.

pub mod client;

pub use client::CompletionClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Message author role
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a completion request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system<T: Into<String>>(content: T) -> Self {
        Self::text(Role::System, content.into())
    }

    pub fn user<T: Into<String>>(content: T) -> Self {
        Self::text(Role::User, content.into())
    }

    /// Assistant turn that requested tool invocations
    pub fn assistant_tool_calls(content: Option<String>, calls: &[ToolCallRequest]) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(calls.iter().map(ToolCallRequest::to_wire).collect()),
            tool_call_id: None,
        }
    }

    /// Tool result keyed by the invocation it answers
    pub fn tool<T, S>(content: T, tool_call_id: S) -> Self
    where
        T: Into<String>,
        S: Into<String>,
    {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Tool invocation as it appears on the wire
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub call_type: String,
    pub function: WireFunctionCall,
}

/// Function name plus arguments
///
/// OpenAI sends `arguments` as a JSON-encoded string; some servers send an
/// object instead, so both are accepted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// A tool declaration offered to the model
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionSpec,
}

/// Name, description and JSON-schema parameters of a declared function
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: FunctionParameters,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionParameters {
    #[serde(rename = "type")]
    pub param_type: String,
    pub properties: BTreeMap<String, Property>,
    pub required: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Property {
    #[serde(rename = "type")]
    pub property_type: String,
    pub description: String,
}

impl ToolSpec {
    /// Declare a function tool with no parameters yet
    pub fn function(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters: FunctionParameters {
                    param_type: "object".to_string(),
                    properties: BTreeMap::new(),
                    required: Vec::new(),
                },
            },
        }
    }

    /// Add a required string parameter
    pub fn with_required_string(mut self, name: &str, description: impl Into<String>) -> Self {
        self.function.parameters.properties.insert(
            name.to_string(),
            Property {
                property_type: "string".to_string(),
                description: description.into(),
            },
        );
        self.function.parameters.required.push(name.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// A tool invocation requested by the model, with decoded arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub id: String,
    pub tool_name: String,
    pub arguments: BTreeMap<String, String>,
}

impl ToolCallRequest {
    /// Decode a wire tool call
    ///
    /// String-valued arguments are kept as-is; any other JSON value is kept
    /// as its JSON text.
    pub fn from_wire(call: &WireToolCall) -> Result<Self, CompletionError> {
        let object = match &call.function.arguments {
            serde_json::Value::String(encoded) if encoded.trim().is_empty() => serde_json::Map::new(),
            serde_json::Value::String(encoded) => {
                match serde_json::from_str::<serde_json::Value>(encoded) {
                    Ok(serde_json::Value::Object(map)) => map,
                    Ok(other) => {
                        return Err(CompletionError::InvalidResponse(format!(
                            "tool call '{}' arguments are not an object: {}",
                            call.function.name, other
                        )));
                    }
                    Err(e) => {
                        return Err(CompletionError::InvalidResponse(format!(
                            "tool call '{}' arguments are not valid JSON: {}",
                            call.function.name, e
                        )));
                    }
                }
            }
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(CompletionError::InvalidResponse(format!(
                    "tool call '{}' arguments are not an object: {}",
                    call.function.name, other
                )));
            }
        };

        let arguments = object
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        Ok(Self {
            id: call.id.clone(),
            tool_name: call.function.name.clone(),
            arguments,
        })
    }

    /// Re-encode for the conversation history of a follow-up call
    pub fn to_wire(&self) -> WireToolCall {
        let arguments: serde_json::Map<String, serde_json::Value> = self
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        WireToolCall {
            id: self.id.clone(),
            call_type: default_tool_type(),
            function: WireFunctionCall {
                name: self.tool_name.clone(),
                arguments: serde_json::Value::String(
                    serde_json::Value::Object(arguments).to_string(),
                ),
            },
        }
    }

    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }
}

/// One assistant reply: text, tool calls, or both
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AssistantTurn {
    /// Collapse to the first requested tool call, or the text otherwise
    pub fn into_result(self) -> CompletionResult {
        match self.tool_calls.into_iter().next() {
            Some(call) => CompletionResult::ToolCall(call),
            None => CompletionResult::Text(self.content.unwrap_or_default()),
        }
    }
}

/// What a single completion produced
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    Text(String),
    ToolCall(ToolCallRequest),
}

/// Structured completion failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion API key is not set ({variable})")]
    MissingCredential { variable: String },

    #[error("completion API rejected credentials (status {status})")]
    Unauthorized { status: u16 },

    #[error("model '{model}' not found (status 404)")]
    ModelNotFound { model: String },

    #[error("completion API rate limit exceeded (status 429)")]
    RateLimited,

    #[error("completion request timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    #[error("completion API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion transport error: {0}")]
    Transport(String),

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
}

/// A chat-completion backend
///
/// [`CompletionClient`] is the production implementation; routers hold an
/// `Arc<dyn ChatModel>` so tests can script replies.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a full conversation, optionally offering tools
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> Result<AssistantTurn, CompletionError>;

    /// System + user exchange, optionally followed by one tool round-trip
    ///
    /// With `prior_tool_exchange`, the history carries the assistant's tool
    /// call and a tool message whose content is the given result, unmodified.
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        tools: Option<&[ToolSpec]>,
        prior_tool_exchange: Option<(ToolCallRequest, String)>,
    ) -> Result<CompletionResult, CompletionError> {
        let mut messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_message),
        ];
        if let Some((call, result)) = prior_tool_exchange {
            let id = call.id.clone();
            messages.push(ChatMessage::assistant_tool_calls(None, &[call]));
            messages.push(ChatMessage::tool(result, id));
        }

        Ok(self.chat(&messages, tools).await?.into_result())
    }
}
