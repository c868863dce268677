//! Chat history persistence
//!
//! Every answered message is recorded as a [`ChatExchange`]. Recording is
//! best-effort from the handler's point of view: a failure is logged and the
//! reply is still returned.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// One user message and the reply it received
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatExchange {
    pub user_message: String,
    pub bot_response: String,
    /// Unix seconds
    pub created_at: u64,
    pub request_id: String,
}

impl ChatExchange {
    /// Stamp a new exchange with the current time
    pub fn new(
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        let created_at = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs(),
            Err(e) => {
                tracing::error!(error = %e, "System clock is before UNIX epoch, using 0");
                0
            }
        };

        Self {
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            created_at,
            request_id: request_id.into(),
        }
    }
}

/// Storage for answered exchanges
#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// Persist one exchange
    async fn record(&self, exchange: ChatExchange) -> AppResult<()>;

    /// Up to `limit` most recent exchanges, newest first
    async fn recent(&self, limit: usize) -> AppResult<Vec<ChatExchange>>;
}

/// Bounded in-process history; the oldest exchange is evicted first
#[derive(Debug)]
pub struct InMemoryHistory {
    capacity: usize,
    entries: Mutex<VecDeque<ChatExchange>>,
}

impl InMemoryHistory {
    /// `capacity` is clamped to at least one entry
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, VecDeque<ChatExchange>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("chat history lock poisoned".to_string()))
    }
}

#[async_trait]
impl ChatHistory for InMemoryHistory {
    async fn record(&self, exchange: ChatExchange) -> AppResult<()> {
        let mut entries = self.lock()?;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(exchange);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AppResult<Vec<ChatExchange>> {
        let entries = self.lock()?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}
