//! OpenAI-compatible gateway provider.
//!
//! Talks to any gateway that answers a JSON POST with an OpenAI-style
//! `choices[0].message.content` body. The exact route differs between
//! gateways, so a list of candidate paths is tried in order and the first
//! one that answers is remembered for the lifetime of the provider.

use crate::brain::LlmProvider;
use crate::config::{LlmConfig, default_endpoint_paths};
use crate::error::LlmError;
use crate::types::truncate_chars;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Appended to responses that exceeded `max_response_chars`.
pub const TRUNCATION_MARKER: &str = "\n\n[response truncated]";

/// OpenAI-compatible gateway provider.
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    timeout_secs: u64,
    max_response_chars: usize,
    endpoint_paths: Vec<String>,
    /// Path that last returned a usable response.
    cached_path: Mutex<Option<String>>,
}

impl OpenAiCompatibleProvider {
    /// Create a provider with an explicit base URL and API key.
    pub fn new(
        config: &LlmConfig,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        let endpoint_paths = if config.endpoint_paths.is_empty() {
            default_endpoint_paths()
        } else {
            config.endpoint_paths.clone()
        };

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            max_response_chars: config.max_response_chars,
            endpoint_paths,
            cached_path: Mutex::new(None),
        })
    }

    /// The path that answered last, if any.
    pub fn cached_path(&self) -> Option<String> {
        self.cached_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Candidate paths for the next call, the cached path first.
    fn candidate_paths(&self) -> Vec<String> {
        let cached = self.cached_path();
        let mut paths = Vec::with_capacity(self.endpoint_paths.len() + 1);
        if let Some(path) = &cached {
            paths.push(path.clone());
        }
        paths.extend(
            self.endpoint_paths
                .iter()
                .filter(|p| Some(*p) != cached.as_ref())
                .cloned(),
        );
        paths
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "max_tokens": self.max_tokens,
            "message": prompt,
            "model": self.model,
            "stream": false,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            LlmError::Connection {
                message: err.to_string(),
            }
        } else {
            LlmError::ApiRequest {
                message: format!("Request failed: {err}"),
            }
        }
    }

    /// Pull `choices[0].message.content` out of a response body.
    fn extract_content(body: &str) -> Result<String, LlmError> {
        let json: Value = serde_json::from_str(body).map_err(|e| LlmError::ResponseParse {
            message: format!("Invalid JSON: {e}"),
        })?;
        json.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::ResponseParse {
                message: "missing choices[0].message.content".to_string(),
            })
    }

    fn cap_response(&self, content: String) -> String {
        let capped = truncate_chars(&content, self.max_response_chars);
        if capped.len() < content.len() {
            warn!(
                limit = self.max_response_chars,
                "Model response exceeded size limit; truncating"
            );
            format!("{capped}{TRUNCATION_MARKER}")
        } else {
            content
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn try_complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = self.request_body(prompt);
        let mut attempts = Vec::new();

        for path in self.candidate_paths() {
            let url = self.endpoint_url(&path);
            debug!(url = %url, model = %self.model, "Sending gateway completion request");

            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            let status = response.status();
            if status != StatusCode::OK {
                debug!(path = %path, status = status.as_u16(), "Endpoint path rejected request");
                attempts.push(format!("{path}: HTTP {}", status.as_u16()));
                continue;
            }

            let text = response.text().await.map_err(|e| self.map_send_error(e))?;
            match Self::extract_content(&text) {
                Ok(content) => {
                    *self
                        .cached_path
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(path.clone());
                    return Ok(self.cap_response(content));
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Unusable response body");
                    attempts.push(format!("{path}: {e}"));
                }
            }
        }

        Err(LlmError::ModelUnavailable { attempts })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
