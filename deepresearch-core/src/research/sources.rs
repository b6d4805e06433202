//! Citation tracking for a research session.
//!
//! [`CitationLedger`] assigns dense, first-seen integer ids to retrieved
//! papers and renders the deterministic citation index that closes every
//! report. Papers are keyed by URL: registering a URL a second time returns
//! the id it already has.

use crate::types::{Citation, Paper, citation_marker, preview};
use std::collections::HashMap;

/// Authors listed per citation index entry.
const INDEX_AUTHOR_LIMIT: usize = 3;

/// Session-scoped mapping from citation id to paper.
#[derive(Debug, Default)]
pub struct CitationLedger {
    citations: Vec<Citation>,
    by_url: HashMap<String, usize>,
}

impl CitationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a paper and return its citation id.
    ///
    /// A paper whose non-empty URL is already known keeps its existing id.
    /// Papers with an empty URL cannot be matched and always get a new id.
    pub fn register(&mut self, paper: Paper) -> usize {
        self.register_new(paper).0
    }

    /// Like [`register`](Self::register), also reporting whether the paper
    /// was seen for the first time.
    pub fn register_new(&mut self, paper: Paper) -> (usize, bool) {
        if !paper.url.is_empty()
            && let Some(id) = self.id_for_url(&paper.url)
        {
            return (id, false);
        }
        let id = self.citations.len() + 1;
        if !paper.url.is_empty() {
            self.by_url.insert(paper.url.clone(), id);
        }
        self.citations.push(Citation { id, paper });
        (id, true)
    }

    /// Look up a citation by id.
    pub fn get(&self, id: usize) -> Option<&Citation> {
        id.checked_sub(1).and_then(|idx| self.citations.get(idx))
    }

    /// Citation id for a URL, if registered.
    pub fn id_for_url(&self, url: &str) -> Option<usize> {
        self.by_url.get(url).copied()
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    /// Citations in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Citation> {
        self.citations.iter()
    }

    /// Registered papers in id order.
    pub fn papers(&self) -> Vec<&Paper> {
        self.citations.iter().map(|c| &c.paper).collect()
    }

    /// Inline marker for an id.
    pub fn marker(id: usize) -> String {
        citation_marker(id)
    }

    /// Render the citation index section.
    ///
    /// One entry per citation in id order; each snippet is cut to
    /// `snippet_chars` characters.
    pub fn render_index(&self, snippet_chars: usize) -> String {
        let mut out = String::from("### Citation Index\n\n");
        if self.citations.is_empty() {
            out.push_str("_No papers were cited._\n");
            return out;
        }
        for citation in &self.citations {
            out.push_str(&render_entry(citation, snippet_chars));
            out.push('\n');
        }
        out
    }
}

fn render_entry(citation: &Citation, snippet_chars: usize) -> String {
    let paper = &citation.paper;
    let mut entry = format!("**{}** {}\n", citation.marker(), paper.title);
    if !paper.authors.is_empty() {
        entry.push_str(&format!(
            "- Authors: {}\n",
            paper.author_line(INDEX_AUTHOR_LIMIT)
        ));
    }
    if !paper.date_published.is_empty() {
        entry.push_str(&format!("- Published: {}\n", paper.date_published));
    }
    if !paper.url.is_empty() {
        entry.push_str(&format!("- Link: [{0}]({0})\n", paper.url));
    }
    if !paper.snippet.is_empty() {
        entry.push_str(&format!(
            "- Summary: {}\n",
            preview(&paper.snippet, snippet_chars)
        ));
    }
    entry
}
