//! Core type definitions for deepresearch.
//!
//! Defines the data structures shared by the search layer, the citation
//! ledger and the research loop: papers, citations, and search rounds.

use serde::{Deserialize, Serialize};

/// A paper retrieved from the academic search provider.
///
/// Immutable once fetched. `url` is the external identifier used for
/// citation deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title with whitespace normalized.
    pub title: String,
    /// Canonical abstract URL (e.g. `http://arxiv.org/abs/1706.03762v7`).
    pub url: String,
    /// Display snippet, already capped by the search layer.
    pub snippet: String,
    /// Full abstract text.
    pub full_text_snippet: String,
    /// Publication date as `YYYY-MM-DD`, or empty when unknown.
    pub date_published: String,
    /// Author names in byline order.
    pub authors: Vec<String>,
    /// Subject categories, first-seen order, no duplicates.
    pub categories: Vec<String>,
    /// Provider-specific identifier (e.g. `1706.03762v7`).
    pub paper_id: String,
}

impl Paper {
    /// Create a paper with the identifying fields set; remaining fields empty.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter for the snippet; also fills `full_text_snippet`
    /// when it is still empty.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        if self.full_text_snippet.is_empty() {
            self.full_text_snippet = self.snippet.clone();
        }
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date_published = date.into();
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for cat in categories {
            let cat = cat.into();
            if !self.categories.contains(&cat) {
                self.categories.push(cat);
            }
        }
        self
    }

    /// Author list limited to `max` names, with an "et al." marker when
    /// names were dropped.
    pub fn author_line(&self, max: usize) -> String {
        let mut line = self
            .authors
            .iter()
            .take(max)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if self.authors.len() > max {
            line.push_str(" et al.");
        }
        line
    }
}

/// A stable integer reference to a retrieved paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Dense, 1-based id assigned in first-seen order.
    pub id: usize,
    pub paper: Paper,
}

impl Citation {
    /// The inline marker used in report text, e.g. `[citation:3]`.
    pub fn marker(&self) -> String {
        citation_marker(self.id)
    }
}

/// Format the inline citation marker for an id.
pub fn citation_marker(id: usize) -> String {
    format!("[citation:{id}]")
}

/// One iteration of query execution within a research session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRound {
    /// 1-based round number.
    pub round_number: usize,
    /// Queries issued this round (1-5 items).
    pub queries: Vec<String>,
    /// Papers first seen during this round, in retrieval order.
    pub papers_found: Vec<Paper>,
}

/// Truncate `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate `text` to `max_chars` characters and append "..." if anything
/// was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_ascii() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("hi", 5), "hi");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        // Each CJK character is three bytes; slicing by bytes would panic.
        assert_eq!(truncate_chars("注意力机制", 2), "注意");
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }

    #[test]
    fn test_author_line_et_al() {
        let paper = Paper::new("T", "u").with_authors(["A", "B", "C", "D"]);
        assert_eq!(paper.author_line(3), "A, B, C et al.");
        assert_eq!(paper.author_line(4), "A, B, C, D");
        assert_eq!(Paper::new("T", "u").author_line(3), "");
    }

    #[test]
    fn test_categories_deduplicated() {
        let paper = Paper::new("T", "u").with_categories(["cs.CL", "cs.AI", "cs.CL"]);
        assert_eq!(paper.categories, vec!["cs.CL", "cs.AI"]);
    }

    #[test]
    fn test_citation_marker() {
        let citation = Citation {
            id: 7,
            paper: Paper::new("T", "u"),
        };
        assert_eq!(citation.marker(), "[citation:7]");
    }

    #[test]
    fn test_with_snippet_fills_full_text() {
        let paper = Paper::new("T", "u").with_snippet("abstract");
        assert_eq!(paper.full_text_snippet, "abstract");
    }
}
