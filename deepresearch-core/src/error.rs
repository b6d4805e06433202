//! Error types for the deepresearch core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! for the language model gateway, the search provider, configuration
//! loading, and the research loop itself.

/// Top-level error type for the research loop.
///
/// Network and model failures inside a session degrade into a shorter report
/// and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid model output: {message}")]
    InvalidModelOutput { message: String },
}

/// Errors from the language model gateway.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Model unavailable: all endpoint paths failed ({})", .attempts.join("; "))]
    ModelUnavailable { attempts: Vec<String> },

    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },
}

/// Errors from the academic search provider.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {message}")]
    Network { message: String },

    #[error("Search provider returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Unparseable provider response: {message}")]
    ProviderFormat { message: String },

    #[error("Invalid paper identifier '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Paper not found: {id}")]
    NotFound { id: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .path.display())]
    FileNotFound { path: std::path::PathBuf },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `ResearchError`.
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_search() {
        let err = SearchError::HttpStatus { status: 503 };
        assert_eq!(err.to_string(), "Search provider returned HTTP 503");
    }

    #[test]
    fn test_config_error_from_figment() {
        let err: ConfigError = figment::Error::from("bad value".to_string()).into();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().starts_with("Configuration parse error: bad value"));
    }

    #[test]
    fn test_config_file_not_found_display() {
        let err = ConfigError::FileNotFound {
            path: "/tmp/missing.toml".into(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration file not found: /tmp/missing.toml"
        );
    }

    #[test]
    fn test_model_unavailable_lists_attempts() {
        let err = LlmError::ModelUnavailable {
            attempts: vec![
                "v1/chat/completions: HTTP 404".into(),
                "chat/completions: HTTP 500".into(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Model unavailable: all endpoint paths failed (v1/chat/completions: HTTP 404; chat/completions: HTTP 500)"
        );
    }

    #[test]
    fn test_invalid_input_display() {
        let err = ResearchError::InvalidInput {
            message: "question is empty".into(),
        };
        assert_eq!(err.to_string(), "Invalid input: question is empty");
    }
}
