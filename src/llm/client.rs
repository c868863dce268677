//! HTTP client for OpenAI-compatible chat completions

use super::{AssistantTurn, ChatMessage, ChatModel, CompletionError, ToolCallRequest, ToolSpec, WireToolCall};
use crate::config::CompletionConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum characters of an error body kept in [`CompletionError::Status`]
const MAX_ERROR_BODY: usize = 500;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSpec]>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

/// Chat-completion client bound to one model
///
/// Temperature, token limit and timeout come from configuration and apply to
/// every call.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: f64,
    max_tokens: u32,
    timeout_seconds: u64,
}

impl CompletionClient {
    /// Create a client from configuration and a resolved API key
    ///
    /// A missing key surfaces as [`CompletionError::MissingCredential`] on
    /// the first call, before any network I/O.
    pub fn new(config: &CompletionConfig, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            api_key,
            api_key_env: config.api_key_env().to_string(),
            temperature: config.temperature(),
            max_tokens: config.max_tokens(),
            timeout_seconds: config.timeout_seconds(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn classify_status(&self, status: StatusCode, body: String) -> CompletionError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::Unauthorized {
                status: status.as_u16(),
            },
            StatusCode::NOT_FOUND => CompletionError::ModelNotFound {
                model: self.model.clone(),
            },
            StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CompletionError::Timeout {
                timeout_seconds: self.timeout_seconds,
            },
            _ => CompletionError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            },
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout {
                timeout_seconds: self.timeout_seconds,
            }
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl ChatModel for CompletionClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> Result<AssistantTurn, CompletionError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(CompletionError::MissingCredential {
                variable: self.api_key_env.clone(),
            });
        };

        let request = CompletionRequest {
            model: &self.model,
            messages,
            tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        tracing::debug!(
            model = %self.model,
            message_count = messages.len(),
            tool_count = tools.map_or(0, |t| t.len()),
            "Sending completion request"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                model = %self.model,
                status = status.as_u16(),
                "Completion API returned non-success status"
            );
            return Err(self.classify_status(status, body));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                CompletionError::InvalidResponse(e.to_string())
            }
        })?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("response contained no choices".to_string()))?
            .message;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .iter()
            .map(ToolCallRequest::from_wire)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            model = %self.model,
            content_length = message.content.as_ref().map_or(0, |c| c.len()),
            tool_calls = tool_calls.len(),
            "Completion succeeded"
        );

        Ok(AssistantTurn {
            content: message.content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResult;
    use std::str::FromStr;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_config(base_url: &str) -> CompletionConfig {
        let toml = format!(
            r#"
[completion]
base_url = "{}"
model = "test-model"
temperature = 0.7
max_tokens = 500
timeout_seconds = 2
"#,
            base_url
        );
        crate::config::Config::from_str(&toml)
            .expect("should parse config")
            .completion
    }

    fn client(server: &MockServer) -> CompletionClient {
        CompletionClient::new(
            &completion_config(&format!("{}/v1", server.uri())),
            Some("secret".to_string()),
        )
    }

    fn text_reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
    }

    #[tokio::test]
    async fn test_complete_returns_text_and_sends_sampling_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "temperature": 0.7,
                "max_tokens": 500,
                "stream": false,
                "messages": [
                    {"role": "system", "content": "be nice"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Hi there!")))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .complete("be nice", "hello", None, None)
            .await
            .expect("should succeed");
        assert_eq!(result, CompletionResult::Text("Hi there!".to_string()));
    }

    #[tokio::test]
    async fn test_tool_call_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"location\":\"Paris\"}"}
                    }]
                }}]
            })))
            .mount(&server)
            .await;

        let tools = [ToolSpec::function("get_weather", "weather").with_required_string("location", "city")];
        let result = client(&server)
            .complete("sys", "weather in paris?", Some(tools.as_slice()), None)
            .await
            .unwrap();

        match result {
            CompletionResult::ToolCall(call) => {
                assert_eq!(call.id, "call_abc");
                assert_eq!(call.tool_name, "get_weather");
                assert_eq!(call.argument("location"), Some("Paris"));
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("x")))
            .expect(0)
            .mount(&server)
            .await;

        let client = CompletionClient::new(&completion_config(&server.uri()), None);
        let err = client.complete("s", "u", None, None).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::MissingCredential {
                variable: "NVIDIA_API_KEY".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_status_codes_map_to_structured_errors() {
        for (status, expected) in [
            (401, CompletionError::Unauthorized { status: 401 }),
            (
                404,
                CompletionError::ModelNotFound {
                    model: "test-model".to_string(),
                },
            ),
            (429, CompletionError::RateLimited),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let err = client(&server).complete("s", "u", None, None).await.unwrap_err();
            assert_eq!(err, expected, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_server_error_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).complete("s", "u", None, None).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Status {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_reply("late"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let err = client(&server).complete("s", "u", None, None).await.unwrap_err();
        assert_eq!(err, CompletionError::Timeout { timeout_seconds: 2 });
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server).complete("s", "u", None, None).await.unwrap_err();
        assert!(matches!(err, CompletionError::InvalidResponse(_)));
    }
}
