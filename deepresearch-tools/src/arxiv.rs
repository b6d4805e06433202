//! Session-scoped arXiv search tool.
//!
//! Wraps [`ArxivClient`] behind the core [`SearchClient`] contract. Each
//! instance remembers the queries it has issued and never sends the same
//! query twice, so one tool per research session keeps sessions isolated.

use async_trait::async_trait;
use deepresearch_core::config::SearchConfig;
use deepresearch_core::error::SearchError;
use deepresearch_core::search::{SearchClient, heuristic_queries};
use deepresearch_core::types::Paper;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::arxiv_api::{ArxivClient, ArxivSearchParams};

#[derive(Default)]
struct SearchLog {
    issued: HashSet<String>,
    history: Vec<String>,
}

pub struct ArxivSearchTool {
    client: ArxivClient,
    categories: Vec<String>,
    log: Mutex<SearchLog>,
}

impl ArxivSearchTool {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: ArxivClient::new(config)?,
            categories: config.categories.clone(),
            log: Mutex::new(SearchLog::default()),
        })
    }

    /// The underlying API client, for single-paper lookups.
    pub fn client(&self) -> &ArxivClient {
        &self.client
    }

    /// Queries issued so far, in order.
    pub fn history(&self) -> Vec<String> {
        self.lock_log().history.clone()
    }

    /// Forget issued queries so they may be searched again.
    pub fn clear_history(&self) {
        let mut log = self.lock_log();
        log.issued.clear();
        log.history.clear();
    }

    fn lock_log(&self) -> MutexGuard<'_, SearchLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `query` as issued. Returns false if it already was.
    fn mark_issued(&self, query: &str) -> bool {
        let mut log = self.lock_log();
        if !log.issued.insert(query.to_string()) {
            return false;
        }
        log.history.push(query.to_string());
        true
    }

    fn was_issued(&self, query: &str) -> bool {
        self.lock_log().issued.contains(query)
    }
}

#[async_trait]
impl SearchClient for ArxivSearchTool {
    async fn search(
        &self,
        queries: &[String],
        max_results_per_query: usize,
    ) -> Result<Vec<Paper>, SearchError> {
        let mut papers = Vec::new();

        for query in queries {
            let query = query.trim();
            if query.is_empty() {
                continue;
            }
            if !self.mark_issued(query) {
                tracing::debug!(query, "Skipping query already searched this session");
                continue;
            }

            let params = ArxivSearchParams::new(query, max_results_per_query)
                .with_categories(&self.categories);
            match self.client.search(&params).await {
                Ok(result) => {
                    tracing::info!(
                        query,
                        found = result.papers.len(),
                        total = result.total_results,
                        "arXiv search complete"
                    );
                    papers.extend(result.papers.into_iter().take(max_results_per_query));
                }
                Err(e) => {
                    tracing::warn!(query, error = %e, "arXiv search failed, skipping query");
                }
            }
        }

        Ok(papers)
    }

    fn suggest_queries(&self, question: &str, max: usize) -> Vec<String> {
        heuristic_queries(question, max, |q| self.was_issued(q))
    }
}
