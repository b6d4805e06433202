//! Language model abstraction.
//!
//! The research loop talks to a model through [`LlmProvider`]: one prompt in,
//! generated text out. Failures are typed through [`LlmProvider::try_complete`];
//! [`LlmProvider::complete`] flattens them into an error-marker string so the
//! loop can degrade instead of aborting.

use crate::error::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Prefix of every string produced by [`LlmProvider::complete`] on failure.
pub const ERROR_MARKER: &str = "error:";

/// Returns true if `text` is an error marker rather than generated content.
pub fn is_error_marker(text: &str) -> bool {
    text.trim_start().starts_with(ERROR_MARKER)
}

/// Trait for language model providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the generated text.
    async fn try_complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Send one prompt; never fails.
    ///
    /// Any error is rendered as `"error: <message>"`. Callers detect it with
    /// [`is_error_marker`].
    async fn complete(&self, prompt: &str) -> String {
        match self.try_complete(prompt).await {
            Ok(text) => text,
            Err(e) => format!("{ERROR_MARKER} {e}"),
        }
    }

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// A mock LLM provider for tests and offline runs.
///
/// Replies are served first-in first-out; once the queue is empty every call
/// returns the default reply (or a connection error for [`MockLlmProvider::failing`]).
pub struct MockLlmProvider {
    model: String,
    default_reply: String,
    offline: bool,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            default_reply: "Next queries: none".to_string(),
            offline: false,
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a MockLlmProvider that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        Self {
            default_reply: text.to_string(),
            ..Self::new()
        }
    }

    /// Create a MockLlmProvider whose every call fails with a connection error.
    pub fn failing() -> Self {
        Self {
            offline: true,
            ..Self::new()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a reply for the next `try_complete` call.
    pub fn queue_response(&self, text: impl Into<String>) {
        self.lock_responses().push_back(Ok(text.into()));
    }

    /// Queue a failure for the next `try_complete` call.
    pub fn queue_error(&self, error: LlmError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn try_complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        let next = self.lock_responses().pop_front();
        match next {
            Some(reply) => reply,
            None if self.offline => Err(LlmError::Connection {
                message: "mock provider offline".into(),
            }),
            None => Ok(self.default_reply.clone()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
