//! LLM provider implementations.
//!
//! Use `create_provider()` to build the gateway provider from config. The
//! base URL and API key come from explicit config values first, then from the
//! environment variables the config names.

pub mod openai_compat;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

pub use openai_compat::OpenAiCompatibleProvider;

/// Resolve the gateway API key from config or the configured environment variable.
pub fn resolve_api_key(config: &LlmConfig) -> Result<String, LlmError> {
    resolve_setting(config.api_key.as_deref(), &config.api_key_env).ok_or_else(|| {
        LlmError::AuthFailed {
            reason: format!("env var '{}' not set", config.api_key_env),
        }
    })
}

/// Resolve the gateway base URL from config or the configured environment variable.
pub fn resolve_base_url(config: &LlmConfig) -> Result<String, LlmError> {
    resolve_setting(config.base_url.as_deref(), &config.base_url_env).ok_or_else(|| {
        LlmError::Connection {
            message: format!("no gateway URL: env var '{}' not set", config.base_url_env),
        }
    })
}

fn resolve_setting(explicit: Option<&str>, env_var: &str) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Create the gateway provider described by `config`.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let base_url = resolve_base_url(config)?;
    let api_key = resolve_api_key(config)?;
    tracing::debug!(model = %config.model, base_url = %base_url, "Creating gateway provider");
    Ok(Arc::new(OpenAiCompatibleProvider::new(
        config, base_url, api_key,
    )?))
}
