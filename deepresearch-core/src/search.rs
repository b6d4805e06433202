//! Search provider contract and query heuristics.
//!
//! [`SearchClient`] is the seam between the research loop and an academic
//! search backend. Implementations return papers in provider order and never
//! re-rank. [`heuristic_queries`] derives fallback queries from the raw
//! question when the model cannot produce any.

use crate::error::SearchError;
use crate::types::Paper;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// An academic search backend.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run each query and return the concatenated results in provider order.
    ///
    /// Implementations skip individual failing queries; an `Err` means the
    /// whole batch could not be served.
    async fn search(
        &self,
        queries: &[String],
        max_results_per_query: usize,
    ) -> Result<Vec<Paper>, SearchError>;

    /// Derive up to `max` search queries from a question without a model.
    fn suggest_queries(&self, question: &str, max: usize) -> Vec<String> {
        heuristic_queries(question, max, |_| false)
    }
}

/// Question words removed before building the main query.
const CHINESE_STOP_WORDS: &[&str] = &[
    "什么时候",
    "在哪里",
    "为什么",
    "什么",
    "如何",
    "哪个",
    "怎么",
    "谁",
    "的",
    "是",
    "在",
    "有",
];

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "what", "which", "who", "whom", "why", "how", "when", "where", "is",
    "are", "was", "were", "do", "does", "did", "of", "in", "on", "for", "to", "and", "or",
    "with", "about", "can", "could", "should", "would", "be", "it", "its",
];

/// Common academic terms mapped to their English search phrasing.
const TERM_MAP: &[(&str, &str)] = &[
    ("深度学习", "deep learning"),
    ("机器学习", "machine learning"),
    ("人工智能", "artificial intelligence"),
    ("神经网络", "neural network"),
    ("自然语言处理", "natural language processing"),
    ("计算机视觉", "computer vision"),
    ("强化学习", "reinforcement learning"),
    ("大语言模型", "large language model"),
    ("变换器", "transformer"),
    ("注意力机制", "attention mechanism"),
    ("卷积神经网络", "convolutional neural network"),
    ("生成对抗网络", "generative adversarial network"),
];

/// Build fallback search queries from a question.
///
/// Produces, in order: the question with stop words stripped, English
/// equivalents of any known Chinese terms, and up to three adjacent-word
/// bigrams. Queries for which `already_searched` returns true are skipped.
pub fn heuristic_queries(
    question: &str,
    max: usize,
    already_searched: impl Fn(&str) -> bool,
) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    let push = |q: String, queries: &mut Vec<String>| {
        if queries.len() < max && !q.is_empty() && !already_searched(&q) && !queries.contains(&q)
        {
            queries.push(q);
        }
    };

    let mut cleaned = question.replace(['?', '？'], " ");
    for word in CHINESE_STOP_WORDS {
        cleaned = cleaned.replace(word, "");
    }
    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| !ENGLISH_STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    push(words.join(" "), &mut queries);

    for (chinese, english) in TERM_MAP {
        if question.contains(chinese) {
            push((*english).to_string(), &mut queries);
        }
    }

    for pair in words.windows(2).take(3) {
        push(pair.join(" "), &mut queries);
    }

    queries
}

/// A search client returning canned papers, for tests and offline runs.
pub struct MockSearchClient {
    papers: Vec<Paper>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl MockSearchClient {
    /// Every query returns `papers` (limited to `max_results_per_query`).
    pub fn with_papers(papers: Vec<Paper>) -> Self {
        Self {
            papers,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every query fails with a network error.
    pub fn failing() -> Self {
        Self {
            papers: Vec::new(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(
        &self,
        queries: &[String],
        max_results_per_query: usize,
    ) -> Result<Vec<Paper>, SearchError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(queries.iter().cloned());
        if self.fail {
            return Err(SearchError::Network {
                message: "mock search offline".into(),
            });
        }
        let per_query = self.papers.iter().take(max_results_per_query);
        Ok(queries
            .iter()
            .flat_map(|_| per_query.clone().cloned())
            .collect())
    }
}
