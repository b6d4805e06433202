//! Research loop: generate queries, search, analyze, decide, report.

use super::output::{NarrativeSource, ReportGenerator, ResearchReport};
use super::prompts;
use super::session::{
    NoOpResearchCallback, ResearchCallback, ResearchPhase, ResearchState, TerminationReason,
};
use super::sources::CitationLedger;
use super::strategy::{NextStep, ResponseStrategy, normalize_queries, strategy_for};
use crate::brain::{LlmProvider, is_error_marker};
use crate::config::ResearchConfig;
use crate::error::ResearchError;
use crate::search::SearchClient;
use crate::types::{Paper, SearchRound};
use std::slice;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};

/// Drives one research session per call to [`run`](Self::run).
///
/// The loop holds no per-session state: every call builds a fresh
/// [`CitationLedger`] and [`ResearchState`], so a single loop can serve
/// many questions without citations leaking between them.
pub struct ResearchLoop {
    llm: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchClient>,
    strategy: Box<dyn ResponseStrategy>,
    callback: Arc<dyn ResearchCallback>,
    config: ResearchConfig,
}

impl ResearchLoop {
    /// Create a loop using the response strategy selected in `config`.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchClient>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            llm,
            search,
            strategy: strategy_for(config.strategy),
            callback: Arc::new(NoOpResearchCallback),
            config,
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn ResponseStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn ResearchCallback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research a question and return the Markdown report.
    ///
    /// Fails only for an empty question; every later failure degrades into a
    /// shorter report.
    pub async fn research(&self, question: &str) -> Result<String, ResearchError> {
        self.run(question).await.map(|report| report.content)
    }

    /// Research a question and return the report with session metadata.
    pub async fn run(&self, question: &str) -> Result<ResearchReport, ResearchError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ResearchError::InvalidInput {
                message: "research question is empty".to_string(),
            });
        }

        let state = ResearchState::new(question);
        let span = info_span!("research", session = %state.id);
        self.run_session(state).instrument(span).await
    }

    async fn run_session(&self, mut state: ResearchState) -> Result<ResearchReport, ResearchError> {
        let mut ledger = CitationLedger::new();
        info!(
            question = %state.question,
            strategy = self.strategy.name(),
            max_rounds = self.config.max_rounds,
            "Starting research session"
        );

        self.set_phase(&mut state, ResearchPhase::Planning);
        let reasoning = self.seed(&state.question).await;

        self.set_phase(&mut state, ResearchPhase::GeneratingQueries);
        state.pending_queries = self.first_queries(&state.question, &reasoning).await;

        while !state.is_terminated() && !state.pending_queries.is_empty() {
            if state.round_count >= self.config.max_rounds {
                state.terminate(TerminationReason::MaxRoundsReached);
                break;
            }
            self.run_round(&mut state, &mut ledger).await;
        }
        let termination = state
            .termination_reason
            .unwrap_or(TerminationReason::ModelSignaledDone);
        info!(
            rounds = state.round_count,
            papers = ledger.len(),
            reason = %termination,
            "Research loop finished"
        );
        self.callback.on_terminated(termination, state.round_count);

        self.set_phase(&mut state, ResearchPhase::Reporting);
        let (narrative, source) = self.narrative(&state.question, &ledger).await;
        let content = ReportGenerator::assemble(
            &narrative,
            &ledger.render_index(self.config.index_snippet_chars),
            &ReportGenerator::statistics(state.round_count, &ledger),
            self.llm.model_name(),
        );
        self.set_phase(&mut state, ResearchPhase::Complete);
        info!(
            chars = content.chars().count(),
            elapsed_secs = state.elapsed_secs(),
            "Report generated"
        );

        Ok(ResearchReport {
            question: state.question,
            content,
            rounds: state.round_count,
            papers: ledger.len(),
            termination,
            narrative: source,
        })
    }

    fn set_phase(&self, state: &mut ResearchState, phase: ResearchPhase) {
        state.transition(phase);
        debug!(phase = %phase, "Research phase changed");
        self.callback.on_phase_change(phase);
    }

    /// Ask the model to reason about the question. Empty on failure.
    async fn seed(&self, question: &str) -> String {
        let date = chrono::Local::now().format("%Y-%m-%d, %A").to_string();
        let response = self.llm.complete(&prompts::seed_prompt(question, &date)).await;
        if is_error_marker(&response) {
            warn!(error = %response.trim(), "Initial reasoning failed; continuing without it");
            return String::new();
        }
        response
    }

    /// Produce the first round's queries, falling back to heuristics and
    /// finally to the question itself.
    async fn first_queries(&self, question: &str, reasoning: &str) -> Vec<String> {
        let max = self.config.max_queries_per_round;
        let prompt =
            prompts::query_prompt(question, reasoning, &self.strategy.query_instructions());
        let response = self.llm.complete(&prompt).await;

        let queries = if is_error_marker(&response) {
            warn!(error = %response.trim(), "Query generation failed; using heuristic queries");
            normalize_queries(self.search.suggest_queries(question, max), max)
        } else {
            normalize_queries(self.strategy.parse_queries(&response), max)
        };

        if queries.is_empty() {
            debug!("No usable queries; searching for the question itself");
            vec![question.to_string()]
        } else {
            queries
        }
    }

    /// Execute one round: search every pending query, register the papers,
    /// then ask the model whether to continue.
    async fn run_round(&self, state: &mut ResearchState, ledger: &mut CitationLedger) {
        state.round_count += 1;
        let round = state.round_count;
        let queries = std::mem::take(&mut state.pending_queries);

        self.set_phase(state, ResearchPhase::Searching);
        info!(round, queries = ?queries, "Starting search round");
        self.callback.on_round_start(round, &queries);

        let mut papers_found: Vec<Paper> = Vec::new();
        for query in &queries {
            let papers = match self
                .search
                .search(slice::from_ref(query), self.config.max_results_per_query)
                .await
            {
                Ok(papers) => papers,
                Err(e) => {
                    warn!(round, query = %query, error = %e, "Search failed; skipping query");
                    Vec::new()
                }
            };
            let returned = papers.len();
            for paper in papers {
                let (id, is_new) = ledger.register_new(paper.clone());
                if is_new {
                    debug!(id, title = %paper.title, "Registered citation");
                    state.papers.push(paper.clone());
                    papers_found.push(paper);
                }
            }
            self.callback.on_query_complete(query, returned);
        }

        let search_round = SearchRound {
            round_number: round,
            queries,
            papers_found,
        };

        if state.papers.is_empty() {
            info!(round, "No papers retrieved; nothing to analyze");
            self.callback.on_round_analysis(&search_round, "");
            state.terminate(TerminationReason::NoResults);
            return;
        }

        self.set_phase(state, ResearchPhase::Analyzing);
        let papers_text = prompts::format_papers_for_analysis(
            &state.papers,
            self.config.analysis_snippet_chars,
            self.config.max_context_chars,
        );
        let prompt = prompts::analysis_prompt(
            &state.question,
            round,
            &papers_text,
            &self.strategy.decision_instructions(),
        );
        let response = self.llm.complete(&prompt).await;
        if is_error_marker(&response) {
            warn!(round, error = %response.trim(), "Analysis failed; stopping search");
            self.callback.on_round_analysis(&search_round, "");
            state.terminate(TerminationReason::Error);
            return;
        }

        match self.strategy.parse_decision(&response) {
            Ok(decision) => {
                self.callback
                    .on_round_analysis(&search_round, &decision.analysis);
                match decision.next {
                    NextStep::Continue(next) => {
                        let next = normalize_queries(next, self.config.max_queries_per_round);
                        if next.is_empty() {
                            state.terminate(TerminationReason::ModelSignaledDone);
                        } else {
                            debug!(round, next = ?next, "Model requested another round");
                            state.pending_queries = next;
                        }
                    }
                    NextStep::Done => {
                        info!(round, "Model signaled research is complete");
                        state.terminate(TerminationReason::ModelSignaledDone);
                    }
                }
            }
            Err(e) => {
                warn!(round, error = %e, "Unreadable decision; treating as done");
                self.callback.on_round_analysis(&search_round, response.trim());
                state.terminate(TerminationReason::ModelSignaledDone);
            }
        }
    }

    /// Produce the narrative part of the report.
    async fn narrative(
        &self,
        question: &str,
        ledger: &CitationLedger,
    ) -> (String, NarrativeSource) {
        if ledger.is_empty() {
            return (
                ReportGenerator::no_results_narrative(question),
                NarrativeSource::Empty,
            );
        }

        let papers_text = prompts::format_papers_for_report(
            ledger.iter().take(self.config.report_paper_limit),
            self.config.report_snippet_chars,
        );
        let response = self
            .llm
            .complete(&prompts::report_prompt(question, &papers_text))
            .await;

        let reason = if is_error_marker(&response) {
            response.trim().to_string()
        } else if response.trim().is_empty() {
            "the model returned an empty response".to_string()
        } else {
            return (response.trim().to_string(), NarrativeSource::Model);
        };
        warn!(reason = %reason, "Report narrative unavailable; using fallback summary");
        (
            ReportGenerator::fallback_narrative(question, ledger, &reason),
            NarrativeSource::Fallback,
        )
    }
}
