//! Integration tests for the function-calling strategy against real clients
//!
//! The completion and weather APIs are both wiremock servers, so these tests
//! cover the wire format of the tool round-trip end to end.

use std::str::FromStr;
use std::sync::Arc;
use weatherbot::config::{Config, RoutingStrategy};
use weatherbot::llm::CompletionClient;
use weatherbot::router::{Branch, CLARIFICATION_PROMPT, FunctionCallingRouter, IntentRouter};
use weatherbot::weather::WeatherClient;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PARIS_SUMMARY: &str = "Weather in Paris:\n\
- Temperature: 21.5°C (Feels like: 20.3°C)\n\
- Condition: Clear Sky\n\
- Humidity: 40%\n\
- Wind Speed: 2.5 m/s";

/// Matches only the follow-up call, which carries a tool message
const TOOL_MESSAGE_MARKER: &str = r#""role":"tool""#;

fn router(weather: &MockServer, model: &MockServer) -> FunctionCallingRouter {
    let toml = format!(
        r#"
[weather]
base_url = "{}"
timeout_seconds = 2

[completion]
base_url = "{}/v1"
model = "test-model"
timeout_seconds = 2

[routing]
strategy = "function_calling"
"#,
        weather.uri(),
        model.uri()
    );
    let config = Config::from_str(&toml).expect("should parse config");
    FunctionCallingRouter::new(
        Arc::new(WeatherClient::new(&config.weather, Some("weather-key".to_string()))),
        Arc::new(CompletionClient::new(&config.completion, Some("model-key".to_string()))),
    )
}

fn text_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

fn tool_reply(arguments: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_7",
                "type": "function",
                "function": {"name": "get_weather", "arguments": arguments}
            }]
        }}]
    })
}

async fn mount_paris(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "main": {"temp": 21.5, "feels_like": 20.3, "humidity": 40},
            "weather": [{"description": "clear sky"}],
            "wind": {"speed": 2.5}
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_first_call(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn mount_follow_up(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(TOOL_MESSAGE_MARKER))
        .respond_with(response)
        .with_priority(1)
        .mount(server)
        .await;
}

async fn request_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}

#[tokio::test]
async fn test_second_call_carries_exact_weather_text() {
    let weather = MockServer::start().await;
    let model = MockServer::start().await;
    mount_paris(&weather).await;
    mount_first_call(&model, tool_reply(r#"{"location":"Paris"}"#)).await;
    mount_follow_up(
        &model,
        ResponseTemplate::new(200).set_body_json(text_reply("It's a lovely 21.5°C in Paris.")),
    )
    .await;

    let reply = router(&weather, &model).route("Do I need a jacket in Paris?").await;

    assert_eq!(reply.text, "It's a lovely 21.5°C in Paris.");
    assert_eq!(reply.branch, Branch::Weather);
    assert_eq!(reply.strategy, RoutingStrategy::FunctionCalling);

    let bodies = request_bodies(&model).await;
    assert_eq!(bodies.len(), 2);

    // First call offers the tool
    assert_eq!(bodies[0]["tools"][0]["function"]["name"], "get_weather");
    assert_eq!(bodies[0]["messages"].as_array().unwrap().len(), 2);

    // Second call replays the tool call and the verbatim lookup text
    let messages = bodies[1]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2]["role"], "assistant");
    assert_eq!(messages[2]["tool_calls"][0]["id"], "call_7");
    assert_eq!(messages[3]["role"], "tool");
    assert_eq!(messages[3]["tool_call_id"], "call_7");
    assert_eq!(messages[3]["content"], PARIS_SUMMARY);
    assert_eq!(bodies[1]["model"], "test-model");
}

#[tokio::test]
async fn test_plain_answer_skips_weather() {
    let weather = MockServer::start().await;
    let model = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&weather)
        .await;
    mount_first_call(&model, text_reply("Hello! How can I help?")).await;

    let reply = router(&weather, &model).route("hi there").await;

    assert_eq!(reply.text, "Hello! How can I help?");
    assert_eq!(reply.branch, Branch::Chat);
}

#[tokio::test]
async fn test_follow_up_failure_returns_weather_text() {
    let weather = MockServer::start().await;
    let model = MockServer::start().await;
    mount_paris(&weather).await;
    mount_first_call(&model, tool_reply(r#"{"location":"Paris"}"#)).await;
    mount_follow_up(&model, ResponseTemplate::new(500).set_body_string("boom")).await;

    let reply = router(&weather, &model).route("weather in paris").await;

    assert_eq!(reply.text, PARIS_SUMMARY);
    assert_eq!(reply.branch, Branch::Weather);
}

#[tokio::test]
async fn test_tool_call_without_location_asks_for_city() {
    let weather = MockServer::start().await;
    let model = MockServer::start().await;
    mount_first_call(&model, tool_reply("{}")).await;

    let reply = router(&weather, &model).route("what's the weather like?").await;

    assert_eq!(reply.text, CLARIFICATION_PROMPT);
    assert!(weather.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limited_first_call_is_rendered() {
    let weather = MockServer::start().await;
    let model = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&model)
        .await;

    let reply = router(&weather, &model).route("weather in paris").await;

    assert_eq!(
        reply.text,
        "❌ Too many requests! Please wait 30 seconds and try again."
    );
}
