//! Deep research loop over an academic search provider.
//!
//! Runs a bounded, sequential process:
//! 1. **Plan**: the model reasons about the question
//! 2. **Generate queries**: the model proposes the first search queries
//! 3. **Search and analyze**: each round runs its queries, registers the
//!    papers as citations, and asks the model whether to keep searching
//! 4. **Report**: narrative, citation index and statistics
//!
//! Model output is read through a [`ResponseStrategy`].

pub mod engine;
pub mod output;
pub mod prompts;
pub mod session;
pub mod sources;
pub mod strategy;

pub use engine::ResearchLoop;
pub use output::{NarrativeSource, ReportGenerator, ResearchReport};
pub use session::{
    NoOpResearchCallback, ResearchCallback, ResearchPhase, ResearchState, TerminationReason,
};
pub use sources::CitationLedger;
pub use strategy::{
    Decision, MarkerStrategy, NextStep, ResponseStrategy, ToolCallStrategy, strategy_for,
};
