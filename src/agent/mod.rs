//! Tool-using agent loop
//!
//! A minimal ReAct-style loop: call the model with every registered tool,
//! run the tools it asks for, append their observations, and repeat until
//! the model answers without tool calls or the step budget runs out.

pub mod tool;

pub use tool::{AsyncToolFn, Tool, ToolExecutionError};

use crate::llm::{ChatMessage, ChatModel, CompletionError, ToolSpec};
use std::sync::Arc;

/// Reply used when the step budget is exhausted
pub const STEP_LIMIT_MESSAGE: &str =
    "I couldn't finish answering within the allowed number of steps. Please try rephrasing your question.";

/// One executed tool call and what it returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub tool_name: String,
    pub tool_call_id: String,
    pub output: String,
}

/// Result of one agent run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutcome {
    pub answer: String,
    pub observations: Vec<Observation>,
    /// Model calls made
    pub steps: usize,
    /// True when the loop stopped on the step budget
    pub exhausted: bool,
}

impl AgentOutcome {
    /// Whether `tool_name` ran at least once
    pub fn used_tool(&self, tool_name: &str) -> bool {
        self.observations.iter().any(|o| o.tool_name == tool_name)
    }
}

/// An agent: a model, a system prompt, and the tools it may call
pub struct Agent {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    tools: Vec<Tool>,
    specs: Vec<ToolSpec>,
    max_steps: usize,
}

impl Agent {
    /// `max_steps` is clamped to at least one model call
    pub fn new(model: Arc<dyn ChatModel>, system_prompt: impl Into<String>, max_steps: usize) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
            specs: Vec::new(),
            max_steps: max_steps.max(1),
        }
    }

    /// Register a tool
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.specs.push(tool.spec().clone());
        self.tools.push(tool);
        self
    }

    /// Answer `prompt`, invoking tools as the model requests
    ///
    /// # Errors
    ///
    /// Returns the first [`CompletionError`] from the model. Tool failures
    /// never abort the run; they are reported back to the model as
    /// observations.
    pub async fn run(&self, prompt: &str) -> Result<AgentOutcome, CompletionError> {
        let mut history = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];
        let mut observations = Vec::new();
        let tools = (!self.specs.is_empty()).then_some(self.specs.as_slice());

        for step in 1..=self.max_steps {
            let turn = self.model.chat(&history, tools).await?;

            if turn.tool_calls.is_empty() {
                tracing::debug!(step, observations = observations.len(), "Agent finished");
                return Ok(AgentOutcome {
                    answer: turn.content.unwrap_or_default(),
                    observations,
                    steps: step,
                    exhausted: false,
                });
            }

            history.push(ChatMessage::assistant_tool_calls(
                turn.content.clone(),
                &turn.tool_calls,
            ));

            for call in &turn.tool_calls {
                tracing::info!(
                    step,
                    tool = %call.tool_name,
                    tool_call_id = %call.id,
                    "Executing tool call"
                );

                let output = match self.tools.iter().find(|t| t.name() == call.tool_name) {
                    Some(tool) => match tool.execute(call.arguments.clone()).await {
                        Ok(output) => output,
                        Err(e) => {
                            tracing::warn!(tool = %call.tool_name, error = %e, "Tool execution failed");
                            format!("Error: {}", e)
                        }
                    },
                    None => {
                        tracing::warn!(tool = %call.tool_name, "No corresponding tool found");
                        format!("Could not find tool: {}", call.tool_name)
                    }
                };

                history.push(ChatMessage::tool(output.as_str(), call.id.as_str()));
                observations.push(Observation {
                    tool_name: call.tool_name.clone(),
                    tool_call_id: call.id.clone(),
                    output,
                });
            }
        }

        tracing::warn!(max_steps = self.max_steps, "Agent exhausted its step budget");
        Ok(AgentOutcome {
            answer: STEP_LIMIT_MESSAGE.to_string(),
            observations,
            steps: self.max_steps,
            exhausted: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{AssistantTurn, Role, ToolCallRequest};
    use crate::router::test_support::{ScriptedModel, text, tool_call};
    use futures::FutureExt;
    use std::collections::BTreeMap;

    fn upper_tool() -> Tool {
        Tool::new(
            ToolSpec::function("upper", "Uppercase text").with_required_string("text", "Text"),
            Arc::new(|args: BTreeMap<String, String>| {
                async move { Ok::<_, ToolExecutionError>(args.get("text").map(|t| t.to_uppercase()).unwrap_or_default()) }
                    .boxed()
            }),
        )
    }

    #[tokio::test]
    async fn test_answer_without_tools_stops_after_one_step() {
        let model = Arc::new(ScriptedModel::new(vec![text("done")]));
        let agent = Agent::new(model.clone(), "sys", 5).with_tool(upper_tool());

        let outcome = agent.run("hi").await.unwrap();
        assert_eq!(outcome.answer, "done");
        assert_eq!(outcome.steps, 1);
        assert!(!outcome.exhausted);
        assert!(outcome.observations.is_empty());
        assert_eq!(model.request(0).1, 1);
    }

    #[tokio::test]
    async fn test_observation_is_fed_back() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_call("c1", "upper", &[("text", "abc")]),
            text("It is ABC"),
        ]));
        let agent = Agent::new(model.clone(), "sys", 5).with_tool(upper_tool());

        let outcome = agent.run("shout abc").await.unwrap();
        assert_eq!(outcome.answer, "It is ABC");
        assert_eq!(outcome.steps, 2);
        assert!(outcome.used_tool("upper"));

        let (messages, _) = model.request(1);
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.content.as_deref(), Some("ABC"));
        assert_eq!(last.tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_unknown_tool_gets_error_observation() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_call("c1", "teleport", &[]),
            text("sorry"),
        ]));
        let agent = Agent::new(model, "sys", 5).with_tool(upper_tool());

        let outcome = agent.run("go").await.unwrap();
        assert_eq!(outcome.observations[0].output, "Could not find tool: teleport");
        assert_eq!(outcome.answer, "sorry");
    }

    #[tokio::test]
    async fn test_tool_error_becomes_observation() {
        let model = Arc::new(ScriptedModel::new(vec![tool_call("c1", "upper", &[]), text("ok")]));
        let agent = Agent::new(model, "sys", 5).with_tool(upper_tool());

        let outcome = agent.run("go").await.unwrap();
        assert_eq!(
            outcome.observations[0].output,
            "Error: missing required argument 'text'"
        );
    }

    #[tokio::test]
    async fn test_step_budget_is_enforced() {
        let looping = || tool_call("c", "upper", &[("text", "x")]);
        let model = Arc::new(ScriptedModel::new(vec![looping(), looping(), looping()]));
        let agent = Agent::new(model.clone(), "sys", 2).with_tool(upper_tool());

        let outcome = agent.run("loop").await.unwrap();
        assert!(outcome.exhausted);
        assert_eq!(outcome.answer, STEP_LIMIT_MESSAGE);
        assert_eq!(outcome.steps, 2);
        assert_eq!(model.request_count(), 2);
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(CompletionError::RateLimited)]));
        let agent = Agent::new(model, "sys", 3);
        assert_eq!(agent.run("x").await.unwrap_err(), CompletionError::RateLimited);
    }

    #[tokio::test]
    async fn test_multiple_calls_in_one_turn() {
        let call = |id: &str, t: &str| ToolCallRequest {
            id: id.to_string(),
            tool_name: "upper".to_string(),
            arguments: BTreeMap::from([("text".to_string(), t.to_string())]),
        };
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(AssistantTurn {
                content: None,
                tool_calls: vec![call("a", "x"), call("b", "y")],
            }),
            text("X and Y"),
        ]));
        let agent = Agent::new(model.clone(), "sys", 5).with_tool(upper_tool());

        let outcome = agent.run("both").await.unwrap();
        assert_eq!(outcome.observations.len(), 2);
        assert_eq!(model.request(1).0.len(), 5);
    }
}
