//! Prompt templates for each model call in a research session.

use crate::types::{Citation, Paper, preview, truncate_chars};

/// Appended to the analysis paper list when the context budget ran out.
pub const OMISSION_MARKER: &str = "\n[further papers omitted to keep the context within limits]\n";

/// Authors listed per paper in the analysis prompt.
const ANALYSIS_AUTHOR_LIMIT: usize = 5;
/// Authors listed per paper in the narrative prompt.
const REPORT_AUTHOR_LIMIT: usize = 2;

const LANGUAGE_RULE: &str = "[Core instruction: language consistency]\n\
    Write your entire answer in the same language as the user's question. \
    If the question is in Chinese, think and write in Chinese.";

/// Step 1: ask the model to reason about the question before searching.
pub fn seed_prompt(question: &str, current_date: &str) -> String {
    format!(
        "The current date is {current_date}. Your primary task is to solve the user's question, \
         using the appropriate tools as needed.\n\n\
         {LANGUAGE_RULE}\n\n\
         You must first think step by step, rigorously, and then plan a search strategy.\n\n\
         The user's question is: {question}\n\n\
         Analyze step by step:\n\
         1. Understand the core requirement of the question\n\
         2. Break the question into its key aspects\n\
         3. Identify the information that needs to be searched for\n\
         4. Plan the search strategy\n\n\
         Explain your reasoning in detail:"
    )
}

/// Step 2: ask the model for the first round of queries.
pub fn query_prompt(question: &str, reasoning: &str, instructions: &str) -> String {
    format!(
        "Based on the following question and analysis, generate the first round of arXiv search queries.\n\n\
         Question: {question}\n\n\
         Analysis: {reasoning}\n\n\
         Rules:\n\
         - Use general, search-engine-friendly keywords.\n\
         - Avoid relative or vague terms.\n\
         - Keep queries short; drop particles, conjunctions and question words.\n\
         - Prefer English academic terminology, as arXiv is primarily in English.\n\
         - Avoid special punctuation.\n\
         - If the question covers several entities or sub-questions, split them into separate queries.\n\n\
         {instructions}"
    )
}

/// Step 3: ask the model to analyze the accumulated papers and decide
/// whether to keep searching.
pub fn analysis_prompt(question: &str, round: usize, papers_text: &str, instructions: &str) -> String {
    format!(
        "Analyze the question below using the arXiv search results gathered through round {round}.\n\n\
         Question: {question}\n\n\
         Search results:\n{papers_text}\n\
         Provide:\n\
         1. An analysis of the current search results\n\
         2. An answer to the question based on the information so far\n\
         3. Important: if the information is not yet sufficient to answer the question fully, \
         or you found new directions worth researching, request follow-up searches\n\n\
         {LANGUAGE_RULE}\n\n\
         {instructions}"
    )
}

/// Step 4a: ask the model for the report narrative.
pub fn report_prompt(question: &str, papers_text: &str) -> String {
    format!(
        "Using the arXiv papers below, write a professional research report for engineers and researchers.\n\n\
         Research question: {question}\n\n\
         Selected papers:\n{papers_text}\n\n\
         Structure the report as follows:\n\n\
         # Research Report\n\n\
         ## 1. Executive Summary\n\
         Answer the question concisely and summarize the core findings and their implications.\n\n\
         ## 2. Background\n\
         The state of research, key challenges and how the field developed.\n\n\
         ## 3. Core Analysis\n\
         The main methods, innovations and experimental results, grounded in the papers.\n\n\
         ## 4. Comparative Analysis\n\
         Strengths, weaknesses, suitable scenarios and limitations of the different approaches.\n\n\
         ## 5. Practical Guidance\n\
         Implementation advice, technology choices and risk assessment.\n\n\
         ## 6. Future Trends\n\
         Recent developments, likely directions and recommendations.\n\n\
         Requirements:\n\
         - Cite papers inline with the [citation:N] format.\n\
         - Give concrete technical detail.\n\
         - {LANGUAGE_RULE}\n\n\
         Write the detailed report:"
    )
}

/// Format papers as numbered blocks for the analysis prompt.
///
/// Paper `i` (0-based) is labelled with citation id `i + 1`. The whole list
/// stays within `max_chars` characters; when the next block would overflow,
/// the omission marker is appended instead and formatting stops.
pub fn format_papers_for_analysis(papers: &[Paper], snippet_chars: usize, max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for (idx, paper) in papers.iter().enumerate() {
        let block = analysis_block(idx + 1, paper, snippet_chars);
        let block_chars = block.chars().count();
        if used + block_chars > max_chars {
            out.push_str(OMISSION_MARKER);
            break;
        }
        used += block_chars;
        out.push_str(&block);
    }
    out
}

fn analysis_block(id: usize, paper: &Paper, snippet_chars: usize) -> String {
    let authors = paper
        .authors
        .iter()
        .take(ANALYSIS_AUTHOR_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "[paper {id} begin]\n\
         [paper title]{title}\n\
         [paper url]{url}\n\
         [paper date published]{date}\n\
         [paper authors]{authors}\n\
         [paper snippet begin]\n{snippet}\n[paper snippet end]\n\
         [paper {id} end]\n\n",
        title = paper.title,
        url = paper.url,
        date = paper.date_published,
        snippet = preview(&paper.snippet, snippet_chars),
    )
}

/// Format citations for the narrative prompt.
pub fn format_papers_for_report<'a>(
    citations: impl IntoIterator<Item = &'a Citation>,
    snippet_chars: usize,
) -> String {
    citations
        .into_iter()
        .map(|c| {
            let paper = &c.paper;
            let mut authors = paper
                .authors
                .iter()
                .take(REPORT_AUTHOR_LIMIT)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if paper.authors.len() > REPORT_AUTHOR_LIMIT {
                authors.push_str(" et al.");
            }
            let snippet = truncate_chars(&paper.snippet, snippet_chars);
            let ellipsis = if snippet.len() < paper.snippet.len() { "..." } else { "" };
            format!(
                "{} {}\nPublished: {} | Authors: {}\nSummary: {snippet}{ellipsis}\n",
                c.marker(),
                paper.title,
                paper.date_published,
                authors,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(n: usize, snippet_len: usize) -> Paper {
        Paper::new(format!("Paper {n}"), format!("http://arxiv.org/abs/{n}"))
            .with_snippet("x".repeat(snippet_len))
            .with_date("2024-01-01")
            .with_authors(["A", "B", "C", "D", "E", "F"])
    }

    #[test]
    fn test_seed_prompt_contains_question_and_date() {
        let prompt = seed_prompt("What is attention?", "2025-01-06, Monday");
        assert!(prompt.contains("What is attention?"));
        assert!(prompt.contains("2025-01-06, Monday"));
    }

    #[test]
    fn test_analysis_block_format() {
        let text = format_papers_for_analysis(&[paper(1, 10)], 500, 80_000);
        assert!(text.starts_with("[paper 1 begin]\n[paper title]Paper 1\n"));
        assert!(text.contains("[paper authors]A, B, C, D, E\n"));
        assert!(!text.contains(", F"));
        assert!(text.contains("[paper 1 end]"));
    }

    #[test]
    fn test_analysis_snippet_capped() {
        let text = format_papers_for_analysis(&[paper(1, 600)], 500, 80_000);
        assert!(text.contains(&format!("{}...", "x".repeat(500))));
        assert!(!text.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_analysis_list_respects_budget() {
        let papers: Vec<Paper> = (1..=300).map(|n| paper(n, 500)).collect();
        let text = format_papers_for_analysis(&papers, 500, 80_000);
        assert!(text.chars().count() <= 80_000 + OMISSION_MARKER.chars().count());
        assert!(text.ends_with(OMISSION_MARKER));
        assert!(text.contains("[paper 1 begin]"));
        assert!(!text.contains("[paper 300 begin]"));
    }

    #[test]
    fn test_report_format_uses_citation_ids() {
        let citations = vec![
            Citation { id: 1, paper: paper(1, 250) },
            Citation { id: 2, paper: paper(2, 20) },
        ];
        let text = format_papers_for_report(&citations, 200);
        assert!(text.contains("[citation:1] Paper 1"));
        assert!(text.contains("[citation:2] Paper 2"));
        assert!(text.contains("Authors: A, B et al."));
        assert!(text.contains(&format!("{}...", "x".repeat(200))));
    }

    #[test]
    fn test_report_prompt_lists_sections() {
        let prompt = report_prompt("q", "papers");
        for section in [
            "Executive Summary",
            "Background",
            "Core Analysis",
            "Comparative Analysis",
            "Practical Guidance",
            "Future Trends",
            "[citation:N]",
        ] {
            assert!(prompt.contains(section), "missing {section}");
        }
    }
}
