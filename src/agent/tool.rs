//! Tool declarations for the agent loop
//!
//! A [`Tool`] pairs the schema sent to the model with an async executor
//! over the decoded string arguments.

use crate::llm::ToolSpec;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a tool invocation produced no output
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolExecutionError {
    #[error("missing required argument '{0}'")]
    MissingArgument(String),
}

/// Signature for an asynchronous tool executor.
///
/// Receives the decoded string arguments of one invocation.
pub type AsyncToolFn = Arc<
    dyn Fn(BTreeMap<String, String>) -> BoxFuture<'static, Result<String, ToolExecutionError>>
        + Send
        + Sync,
>;

/// A named, described callable the agent may invoke.
#[derive(Clone)]
pub struct Tool {
    spec: ToolSpec,
    executor: AsyncToolFn,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("spec", &self.spec)
            .field("executor", &"<async_fn>")
            .finish()
    }
}

impl Tool {
    pub fn new(spec: ToolSpec, executor: AsyncToolFn) -> Self {
        Self { spec, executor }
    }

    /// Declaration sent to the model
    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    /// Run the executor, checking required arguments first
    pub async fn execute(&self, args: BTreeMap<String, String>) -> Result<String, ToolExecutionError> {
        if let Some(missing) = self
            .spec
            .function
            .parameters
            .required
            .iter()
            .find(|name| args.get(name.as_str()).is_none_or(|v| v.trim().is_empty()))
        {
            return Err(ToolExecutionError::MissingArgument(missing.clone()));
        }
        (self.executor)(args).await
    }
}
