//! # Deepresearch Core
//!
//! Core library for multi-round academic research.
//! Provides the research loop, the language model interface (brain), the
//! search provider contract, citation tracking, configuration, and the
//! fundamental paper types.

pub mod brain;
pub mod config;
pub mod error;
pub mod providers;
pub mod research;
pub mod search;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{ERROR_MARKER, LlmProvider, MockLlmProvider, is_error_marker};
pub use config::{AppConfig, LlmConfig, ResearchConfig, SearchConfig, StrategyKind, load_config};
pub use error::{ConfigError, LlmError, ResearchError, Result, SearchError};
pub use providers::{OpenAiCompatibleProvider, create_provider};
pub use research::{
    CitationLedger, NarrativeSource, ResearchCallback, ResearchLoop, ResearchPhase,
    ResearchReport, TerminationReason,
};
pub use search::{MockSearchClient, SearchClient, heuristic_queries};
pub use types::{Citation, Paper, SearchRound};
