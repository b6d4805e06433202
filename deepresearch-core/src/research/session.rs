//! Research session state and progress reporting.
//!
//! A [`ResearchState`] lives for exactly one call to
//! [`ResearchLoop::run`](super::ResearchLoop::run) and is never shared between
//! sessions.

use crate::types::{Paper, SearchRound};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current phase of a research session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchPhase {
    /// Seeding the model with the question.
    Planning,
    /// Asking the model for the first queries.
    GeneratingQueries,
    /// Executing a round of queries.
    Searching,
    /// Asking the model to analyze accumulated papers.
    Analyzing,
    /// Writing the final report.
    Reporting,
    /// Research complete.
    Complete,
}

impl std::fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResearchPhase::Planning => "planning",
            ResearchPhase::GeneratingQueries => "generating_queries",
            ResearchPhase::Searching => "searching",
            ResearchPhase::Analyzing => "analyzing",
            ResearchPhase::Reporting => "reporting",
            ResearchPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Why the round loop stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model asked for no further queries (or its decision was unreadable).
    ModelSignaledDone,
    /// The round budget was used up.
    MaxRoundsReached,
    /// No papers were retrieved, so there was nothing to analyze.
    NoResults,
    /// The analysis call failed.
    Error,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TerminationReason::ModelSignaledDone => "model signaled done",
            TerminationReason::MaxRoundsReached => "max rounds reached",
            TerminationReason::NoResults => "no results",
            TerminationReason::Error => "error",
        };
        f.write_str(text)
    }
}

/// Mutable state of one research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    /// Unique session ID.
    pub id: Uuid,
    pub question: String,
    pub started_at: DateTime<Utc>,
    pub phase: ResearchPhase,
    /// Papers first seen during this session, in retrieval order.
    pub papers: Vec<Paper>,
    /// Queries for the next round.
    pub pending_queries: Vec<String>,
    /// Rounds executed so far.
    pub round_count: usize,
    pub termination_reason: Option<TerminationReason>,
}

impl ResearchState {
    /// Create the state for a new session.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            started_at: Utc::now(),
            phase: ResearchPhase::Planning,
            papers: Vec::new(),
            pending_queries: Vec::new(),
            round_count: 0,
            termination_reason: None,
        }
    }

    /// Transition to a new phase.
    pub fn transition(&mut self, phase: ResearchPhase) {
        self.phase = phase;
    }

    /// Stop the round loop.
    pub fn terminate(&mut self, reason: TerminationReason) {
        self.termination_reason = Some(reason);
        self.pending_queries.clear();
    }

    pub fn is_terminated(&self) -> bool {
        self.termination_reason.is_some()
    }

    /// Seconds since the session started.
    pub fn elapsed_secs(&self) -> f64 {
        (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Callback trait for progressive research UI updates.
///
/// Every method has an empty default so implementors only override what
/// they display.
pub trait ResearchCallback: Send + Sync {
    /// Called when the research phase changes.
    fn on_phase_change(&self, _phase: ResearchPhase) {}
    /// Called before a round's queries are executed.
    fn on_round_start(&self, _round: usize, _queries: &[String]) {}
    /// Called after each query, with the number of papers it returned.
    fn on_query_complete(&self, _query: &str, _papers_found: usize) {}
    /// Called after a round has been searched and analyzed.
    fn on_round_analysis(&self, _round: &SearchRound, _analysis: &str) {}
    /// Called once when the round loop stops.
    fn on_terminated(&self, _reason: TerminationReason, _rounds: usize) {}
}

/// No-op callback.
pub struct NoOpResearchCallback;

impl ResearchCallback for NoOpResearchCallback {}
