//! Configuration system for deepresearch.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit config file -> environment.
//! Configuration is loaded from `~/.config/deepresearch/config.toml` and/or
//! `.deepresearch/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for a research session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub research: ResearchConfig,
    pub search: SearchConfig,
}

impl AppConfig {
    /// Validate every section and return the collected warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.llm.validate();
        warnings.extend(self.research.validate());
        warnings.extend(self.search.validate());
        warnings
    }
}

/// Configuration for the language model gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier sent with every request (e.g., "deepseek-v3").
    pub model: String,
    /// Explicit gateway base URL. Takes precedence over `base_url_env`.
    pub base_url: Option<String>,
    /// Environment variable holding the gateway base URL.
    pub base_url_env: String,
    /// Explicit API key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Responses longer than this many characters are truncated.
    pub max_response_chars: usize,
    /// Candidate endpoint paths, tried in order.
    pub endpoint_paths: Vec<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-v3".to_string(),
            base_url: None,
            base_url_env: "LLM_API_URL".to_string(),
            api_key: None,
            api_key_env: "LLM_API_KEY".to_string(),
            max_tokens: 128_000,
            timeout_secs: 120,
            max_response_chars: 120_000,
            endpoint_paths: default_endpoint_paths(),
        }
    }
}

/// The endpoint paths tried against an OpenAI-compatible gateway.
pub fn default_endpoint_paths() -> Vec<String> {
    [
        "v1/chat/completions",
        "chat/completions",
        "v1/completions",
        "completions",
        "api/v1/chat/completions",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl LlmConfig {
    /// Validate this LLM config and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.model.trim().is_empty() {
            warnings.push("llm.model is empty; the gateway may reject requests".to_string());
        }
        if self.endpoint_paths.is_empty() {
            warnings.push(
                "llm.endpoint_paths is empty; the default path list will be used".to_string(),
            );
        }
        if self.timeout_secs == 0 {
            warnings.push("llm.timeout_secs is 0; every request will time out".to_string());
        }
        if self.max_response_chars == 0 {
            warnings.push(
                "llm.max_response_chars is 0; every response will be truncated".to_string(),
            );
        }
        warnings
    }
}

/// Which grammar the loop uses to read the model's decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// A plain `Next queries:` line with `||`-separated queries.
    #[default]
    Marker,
    /// An `arxiv_search` tool call in the model's special-token syntax.
    ToolCall,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Marker => write!(f, "marker"),
            StrategyKind::ToolCall => write!(f, "tool_call"),
        }
    }
}

/// Limits and formatting knobs for the research loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Maximum number of search rounds per session.
    pub max_rounds: usize,
    /// Results requested from the search provider per query.
    pub max_results_per_query: usize,
    /// Queries executed per round at most.
    pub max_queries_per_round: usize,
    /// Character budget for the paper list in the analysis prompt.
    pub max_context_chars: usize,
    /// Snippet length per paper in the analysis prompt.
    pub analysis_snippet_chars: usize,
    /// Papers included in the narrative prompt.
    pub report_paper_limit: usize,
    /// Snippet length per paper in the narrative prompt.
    pub report_snippet_chars: usize,
    /// Snippet length per entry in the citation index.
    pub index_snippet_chars: usize,
    pub strategy: StrategyKind,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            max_results_per_query: 5,
            max_queries_per_round: 5,
            max_context_chars: 80_000,
            analysis_snippet_chars: 500,
            report_paper_limit: 20,
            report_snippet_chars: 200,
            index_snippet_chars: 150,
            strategy: StrategyKind::Marker,
        }
    }
}

impl ResearchConfig {
    /// Validate this research config and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.max_rounds == 0 {
            warnings.push(
                "research.max_rounds is 0; no searches will run and the report will be empty"
                    .to_string(),
            );
        }
        if self.max_results_per_query == 0 {
            warnings.push("research.max_results_per_query is 0; searches return nothing".into());
        }
        if self.max_queries_per_round == 0 {
            warnings.push(
                "research.max_queries_per_round is 0; the question itself will be the only query"
                    .to_string(),
            );
        }
        if self.max_context_chars < 1_000 {
            warnings.push(format!(
                "research.max_context_chars ({}) is very small; analysis prompts will omit most papers",
                self.max_context_chars
            ));
        }
        warnings
    }
}

/// Configuration for the arXiv search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Atom query endpoint.
    pub base_url: String,
    /// Minimum delay between successive requests, in milliseconds.
    pub request_interval_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional category filter (e.g., "cs.CL"), OR-joined.
    pub categories: Vec<String>,
    /// Length of the display snippet cut from each abstract.
    pub snippet_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://export.arxiv.org/api/query".to_string(),
            request_interval_ms: 1_000,
            timeout_secs: 10,
            categories: Vec::new(),
            snippet_chars: 300,
        }
    }
}

impl SearchConfig {
    /// Validate this search config and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.request_interval_ms < 1_000 {
            warnings.push(format!(
                "search.request_interval_ms ({}) is below arXiv's requested 1s spacing",
                self.request_interval_ms
            ));
        }
        if self.timeout_secs == 0 {
            warnings.push("search.timeout_secs is 0; every request will time out".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            warnings.push(format!(
                "search.base_url '{}' is not an http(s) URL",
                self.base_url
            ));
        }
        warnings
    }
}

/// Load configuration from all layers.
///
/// Lowest to highest precedence: defaults, user config, workspace config,
/// `config_file`, then `DEEPRESEARCH_*` environment variables.
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    // User-level config
    if let Some(dirs) = directories::ProjectDirs::from("dev", "deepresearch", "deepresearch") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".deepresearch").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (DEEPRESEARCH_LLM__MODEL, DEEPRESEARCH_RESEARCH__MAX_ROUNDS, etc.)
    figment = figment.merge(Env::prefixed("DEEPRESEARCH_").split("__"));

    Ok(figment.extract()?)
}

/// Check whether any deepresearch configuration file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = directories::ProjectDirs::from("dev", "deepresearch", "deepresearch")
        && dirs.config_dir().join("config.toml").exists()
    {
        return true;
    }
    workspace.is_some_and(|ws| ws.join(".deepresearch").join("config.toml").exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.model, "deepseek-v3");
        assert_eq!(config.llm.api_key_env, "LLM_API_KEY");
        assert_eq!(config.llm.base_url_env, "LLM_API_URL");
        assert_eq!(config.llm.endpoint_paths.len(), 5);
        assert_eq!(config.llm.endpoint_paths[0], "v1/chat/completions");
        assert_eq!(config.research.max_rounds, 5);
        assert_eq!(config.research.max_context_chars, 80_000);
        assert_eq!(config.research.strategy, StrategyKind::Marker);
        assert_eq!(config.search.request_interval_ms, 1_000);
        assert!(config.search.categories.is_empty());
    }

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(AppConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_zero_rounds_warns() {
        let config = ResearchConfig {
            max_rounds: 0,
            ..Default::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("max_rounds"));
    }

    #[test]
    fn test_validate_search_interval_warns() {
        let config = SearchConfig {
            request_interval_ms: 0,
            base_url: "ftp://example".into(),
            ..Default::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_strategy_kind_display_and_serde() {
        assert_eq!(StrategyKind::Marker.to_string(), "marker");
        assert_eq!(StrategyKind::ToolCall.to_string(), "tool_call");
        let json = serde_json::to_string(&StrategyKind::ToolCall).unwrap();
        assert_eq!(json, "\"tool_call\"");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.llm.model, config.llm.model);
        assert_eq!(deserialized.research.max_rounds, config.research.max_rounds);
        assert_eq!(deserialized.search.base_url, config.search.base_url);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str("[research]\nmax_rounds = 2\n").unwrap();
        assert_eq!(config.research.max_rounds, 2);
        assert_eq!(config.research.max_results_per_query, 5);
        assert_eq!(config.llm.model, "deepseek-v3");
    }

    #[test]
    fn test_load_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.search.base_url, "http://export.arxiv.org/api/query");
    }

    #[test]
    fn test_load_config_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".deepresearch");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[research]\nmax_rounds = 3\nstrategy = \"tool_call\"\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.research.max_rounds, 3);
        assert_eq!(config.research.strategy, StrategyKind::ToolCall);
        assert!(config_exists(Some(dir.path())));
    }

    #[test]
    fn test_load_config_explicit_file_overrides_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".deepresearch");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[llm]\nmodel = \"ws-model\"\n").unwrap();

        let mut explicit = tempfile::NamedTempFile::new().unwrap();
        writeln!(explicit, "[llm]\nmodel = \"explicit-model\"").unwrap();

        let config = load_config(Some(dir.path()), Some(explicit.path())).unwrap();
        assert_eq!(config.llm.model, "explicit-model");
    }

    #[test]
    fn test_load_config_rejects_bad_types() {
        let mut explicit = tempfile::NamedTempFile::new().unwrap();
        writeln!(explicit, "[research]\nmax_rounds = \"many\"").unwrap();
        let err = load_config(None, Some(explicit.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(Some(dir.path()), Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { ref path } if path == &missing));
        assert!(err.to_string().contains("nope.toml"));
    }
}
