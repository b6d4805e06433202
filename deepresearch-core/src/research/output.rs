//! Final report assembly.
//!
//! A report has three independently produced parts: the narrative (usually
//! written by the model), the citation index (rendered from the ledger), and
//! research statistics. They are joined with `---` separators and followed by
//! a provenance footer.

use super::session::TerminationReason;
use super::sources::CitationLedger;
use crate::types::{Paper, preview};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Categories listed by name in the statistics section.
const TOP_CATEGORY_LIMIT: usize = 8;
/// Papers listed as key findings in the fallback narrative.
const FALLBACK_FINDINGS_LIMIT: usize = 10;
const FALLBACK_SNIPPET_CHARS: usize = 150;

pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Where the narrative part of a report came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    /// Written by the model.
    Model,
    /// The model failed; a deterministic summary was used instead.
    Fallback,
    /// No papers were found, so there was nothing to narrate.
    Empty,
}

/// A completed research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    /// The original research question.
    pub question: String,
    /// The full Markdown report.
    pub content: String,
    /// Search rounds executed.
    pub rounds: usize,
    /// Distinct papers retrieved.
    pub papers: usize,
    pub termination: TerminationReason,
    pub narrative: NarrativeSource,
}

impl ResearchReport {
    /// Number of inline `[citation:` markers in the report.
    pub fn citation_marker_count(&self) -> usize {
        self.content.matches("[citation:").count()
    }
}

/// Builds the deterministic parts of a report.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Narrative used when no papers were retrieved.
    pub fn no_results_narrative(question: &str) -> String {
        format!(
            "# Research Report\n\n\
             No relevant academic papers were found for \"{question}\".\n\n\
             Try rephrasing the question with more specific technical terms, \
             or broaden it to a related research area."
        )
    }

    /// Narrative used when the model could not write one.
    pub fn fallback_narrative(question: &str, ledger: &CitationLedger, reason: &str) -> String {
        let papers = ledger.papers();
        let (earliest, latest) = date_range(papers.iter().copied());

        let mut findings = String::new();
        for citation in ledger.iter().take(FALLBACK_FINDINGS_LIMIT) {
            let paper = &citation.paper;
            findings.push_str(&format!(
                "\n**{}** {}\n*Published {}*\n{}\n",
                citation.marker(),
                paper.title,
                display_date(&paper.date_published),
                preview(&paper.snippet, FALLBACK_SNIPPET_CHARS),
            ));
        }

        format!(
            "# Research Report\n\n\
             ## Executive Summary\n\
             A literature survey of {count} arXiv papers was carried out for \"{question}\".\n\n\
             ## Search Overview\n\
             {count} relevant papers were retrieved, covering:\n\
             - Earliest paper: {earliest}\n\
             - Latest paper: {latest}\n\n\
             ## Key Findings\n\
             The following papers were identified as most relevant:\n\
             {findings}\n\
             ## Note\n\
             The model could not produce a full analysis ({reason}), so this report is a condensed summary. \
             See the citation index below for every paper with its abstract and link.\n\n\
             ## Recommendations\n\
             1. Prioritize recent, highly relevant papers\n\
             2. Study the frequently cited foundational papers in depth\n\
             3. Compare the approaches taken by different research groups",
            count = papers.len(),
        )
    }

    /// The research statistics section.
    pub fn statistics(rounds: usize, ledger: &CitationLedger) -> String {
        let papers = ledger.papers();
        let (earliest, latest) = date_range(papers.iter().copied());
        let categories = category_frequencies(papers.iter().copied());

        let mut out = format!(
            "## Research Statistics\n\n\
             - **Search rounds**: {rounds}\n\
             - **Papers retrieved**: {}\n\
             - **Time span**: {earliest} to {latest}\n\
             - **Research areas**: {}\n\n\
             ### Main Research Areas\n",
            papers.len(),
            categories.len(),
        );

        if categories.is_empty() {
            out.push_str("- Uncategorized\n");
        }
        for (name, count) in categories.iter().take(TOP_CATEGORY_LIMIT) {
            out.push_str(&format!("- **{name}** ({count})\n"));
        }
        if categories.len() > TOP_CATEGORY_LIMIT {
            out.push_str(&format!(
                "- and {} more\n",
                categories.len() - TOP_CATEGORY_LIMIT
            ));
        }
        out
    }

    /// Join the report parts and append the provenance footer.
    pub fn assemble(narrative: &str, index: &str, statistics: &str, model: &str) -> String {
        format!(
            "{}{SECTION_SEPARATOR}{}{SECTION_SEPARATOR}{}\n\n\
             *This report was generated from live arXiv search results and analyzed by {model}.*\n",
            narrative.trim_end(),
            index.trim_end(),
            statistics.trim_end(),
        )
    }
}

fn display_date(date: &str) -> &str {
    if date.is_empty() { "unknown" } else { date }
}

/// Earliest and latest non-empty publication dates, or "unknown".
fn date_range<'a>(papers: impl Iterator<Item = &'a Paper>) -> (String, String) {
    let dates: Vec<&str> = papers
        .map(|p| p.date_published.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    let earliest = dates.iter().min().copied().unwrap_or("unknown");
    let latest = dates.iter().max().copied().unwrap_or("unknown");
    (earliest.to_string(), latest.to_string())
}

/// Distinct categories with paper counts, most frequent first, ties by name.
fn category_frequencies<'a>(papers: impl Iterator<Item = &'a Paper>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for paper in papers {
        for cat in &paper.categories {
            *counts.entry(cat.as_str()).or_default() += 1;
        }
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}
