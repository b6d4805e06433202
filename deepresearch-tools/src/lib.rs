//! # Deepresearch Tools
//!
//! Search backends for the research loop.
//! Provides the arXiv Atom API client and the session-scoped search tool
//! that implements [`deepresearch_core::SearchClient`].

pub mod arxiv;
pub mod arxiv_api;

pub use arxiv::ArxivSearchTool;
pub use arxiv_api::{ArxivClient, ArxivSearchParams, ArxivSearchResult, ArxivSortBy};
