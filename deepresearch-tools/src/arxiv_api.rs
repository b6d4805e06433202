//! arXiv API client: rate-limited HTTP access and a small Atom feed parser.

use deepresearch_core::config::SearchConfig;
use deepresearch_core::error::SearchError;
use deepresearch_core::types::{Paper, preview};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!("deepresearch/", env!("CARGO_PKG_VERSION"));

/// Search parameters for a single arXiv query.
#[derive(Debug, Clone)]
pub struct ArxivSearchParams {
    pub query: String,
    /// Categories OR-joined into a `cat:` filter; empty means no filter.
    pub categories: Vec<String>,
    pub max_results: usize,
    pub start: usize,
    pub sort_by: ArxivSortBy,
}

impl ArxivSearchParams {
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            categories: Vec::new(),
            max_results,
            start: 0,
            sort_by: ArxivSortBy::Relevance,
        }
    }

    pub fn with_categories(mut self, categories: &[String]) -> Self {
        self.categories = categories.to_vec();
        self
    }
}

/// Sort criteria for arXiv search. Results are always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArxivSortBy {
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl ArxivSortBy {
    pub fn as_api_str(&self) -> &str {
        match self {
            ArxivSortBy::Relevance => "relevance",
            ArxivSortBy::LastUpdatedDate => "lastUpdatedDate",
            ArxivSortBy::SubmittedDate => "submittedDate",
        }
    }
}

/// Parsed feed: papers in provider order plus the OpenSearch totals.
#[derive(Debug, Clone, Default)]
pub struct ArxivSearchResult {
    pub papers: Vec<Paper>,
    pub total_results: usize,
    pub start_index: usize,
}

/// HTTP client for the arXiv Atom API.
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    interval: Duration,
    snippet_chars: usize,
    last_request: Mutex<Option<Instant>>,
}

impl ArxivClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::Network {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            interval: Duration::from_millis(config.request_interval_ms),
            snippet_chars: config.snippet_chars,
            last_request: Mutex::new(None),
        })
    }

    /// Wait until `interval` has passed since the previous request.
    async fn rate_limit(&self) {
        let wait = {
            let last = self
                .last_request
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            (*last).and_then(|instant| self.interval.checked_sub(instant.elapsed()))
        };

        if let Some(wait) = wait
            && !wait.is_zero()
        {
            tokio::time::sleep(wait).await;
        }

        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    async fn fetch_feed(&self, url: &str) -> Result<ArxivSearchResult, SearchError> {
        self.rate_limit().await;
        tracing::debug!(url, "arXiv request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SearchError::Network {
            message: format!("failed to read arXiv response: {e}"),
        })?;

        parse_atom_response(&body, self.snippet_chars)
    }

    /// Search arXiv with the given parameters.
    pub async fn search(
        &self,
        params: &ArxivSearchParams,
    ) -> Result<ArxivSearchResult, SearchError> {
        let url = build_search_url(&self.base_url, params);
        self.fetch_feed(&url).await
    }

    /// Fetch a single paper by its arXiv identifier.
    pub async fn fetch_paper(&self, arxiv_id: &str) -> Result<Paper, SearchError> {
        let clean_id = arxiv_id.trim();
        validate_arxiv_id(clean_id)?;

        let url = format!("{}?id_list={}", self.base_url, urlencoding::encode(clean_id));
        let result = self.fetch_feed(&url).await?;
        result
            .papers
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::NotFound {
                id: clean_id.to_string(),
            })
    }
}

// ── URL Building ──────────────────────────────────────────────

/// Build the `search_query` expression: `all:q`, or
/// `(all:q) AND (cat:a OR cat:b)` when categories are given.
pub fn build_search_query(query: &str, categories: &[String]) -> String {
    let base = format!("all:{}", query.trim());
    if categories.is_empty() {
        return base;
    }
    let cats = categories
        .iter()
        .map(|c| format!("cat:{c}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({base}) AND ({cats})")
}

/// Build the full request URL for a search.
pub fn build_search_url(base_url: &str, params: &ArxivSearchParams) -> String {
    format!(
        "{}?search_query={}&start={}&max_results={}&sortBy={}&sortOrder=descending",
        base_url,
        urlencoding::encode(&build_search_query(&params.query, &params.categories)),
        params.start,
        params.max_results,
        params.sort_by.as_api_str(),
    )
}

/// PDF location for an arXiv identifier.
pub fn pdf_url(arxiv_id: &str) -> String {
    format!("https://arxiv.org/pdf/{arxiv_id}.pdf")
}

// ── XML Parsing ───────────────────────────────────────────────

/// Parse an Atom feed from the arXiv API.
///
/// Entries missing an id or a title are skipped. A body that is not an Atom
/// feed at all is a [`SearchError::ProviderFormat`].
pub fn parse_atom_response(
    xml: &str,
    snippet_chars: usize,
) -> Result<ArxivSearchResult, SearchError> {
    if !xml.contains("<feed") {
        return Err(SearchError::ProviderFormat {
            message: format!("expected an Atom feed, got: {}", preview(xml.trim(), 80)),
        });
    }

    let total_results = extract_opensearch_value(xml, "totalResults").unwrap_or(0);
    let start_index = extract_opensearch_value(xml, "startIndex").unwrap_or(0);

    let papers = extract_blocks(xml, "<entry>", "</entry>")
        .into_iter()
        .filter_map(|entry| parse_entry(entry, snippet_chars))
        .collect();

    Ok(ArxivSearchResult {
        papers,
        total_results,
        start_index,
    })
}

/// Slices of every `open ... close` block, in document order.
fn extract_blocks<'a>(xml: &'a str, open: &str, close: &str) -> Vec<&'a str> {
    let mut blocks = Vec::new();
    let mut search_from = 0;

    while let Some(pos) = xml[search_from..].find(open) {
        let start = search_from + pos;
        let Some(end_pos) = xml[start..].find(close) else {
            break;
        };
        let end = start + end_pos + close.len();
        blocks.push(&xml[start..end]);
        search_from = end;
    }

    blocks
}

fn parse_entry(entry: &str, snippet_chars: usize) -> Option<Paper> {
    let id_url = extract_tag_text(entry, "id").filter(|s| !s.is_empty())?;
    let title = normalize_whitespace(&extract_tag_text(entry, "title")?);
    if title.is_empty() {
        return None;
    }
    let summary = normalize_whitespace(&extract_tag_text(entry, "summary").unwrap_or_default());
    let published = extract_tag_text(entry, "published").unwrap_or_default();

    let authors = extract_blocks(entry, "<author>", "</author>")
        .into_iter()
        .filter_map(|block| extract_tag_text(block, "name"))
        .map(|name| normalize_whitespace(&name))
        .filter(|name| !name.is_empty());

    let mut categories = Vec::new();
    let mut cat_search = 0;
    while let Some(pos) = entry[cat_search..].find("<category") {
        let cat_start = cat_search + pos;
        let Some(end_pos) = entry[cat_start..].find('>') else {
            break;
        };
        let cat_end = cat_start + end_pos + 1;
        if let Some(term) = extract_attribute(&entry[cat_start..cat_end], "term") {
            categories.push(term);
        }
        cat_search = cat_end;
    }

    let paper_id = extract_arxiv_id_from_url(&id_url);
    Some(
        Paper {
            full_text_snippet: summary.clone(),
            paper_id,
            ..Paper::new(title, id_url)
        }
        .with_snippet(preview(&summary, snippet_chars))
        .with_date(published.chars().take(10).collect::<String>())
        .with_authors(authors)
        .with_categories(categories),
    )
}

/// Text content of the first `<tag>text</tag>`, entity-decoded and trimmed.
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    // Skip longer tags sharing the prefix, e.g. `<id>` vs `<idx>`.
    let mut from = 0;
    let start_pos = loop {
        let pos = from + xml[from..].find(&open)?;
        match xml[pos + open.len()..].chars().next() {
            Some('>') | Some(' ') | Some('\n') | Some('\t') | Some('\r') => break pos,
            _ => from = pos + open.len(),
        }
    };
    let content_start = xml[start_pos..].find('>')? + start_pos + 1;
    let content_end = xml[content_start..].find(&close)? + content_start;

    Some(decode_entities(xml[content_start..content_end].trim()))
}

/// Extract an attribute value from a tag string.
pub fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let search = format!("{attr}=\"");
    let start = tag.find(&search)? + search.len();
    let end = tag[start..].find('"')? + start;
    Some(decode_entities(&tag[start..end]))
}

/// Decode the five predefined XML entities.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// The arXiv identifier from a URL like "http://arxiv.org/abs/1706.03762v7".
pub fn extract_arxiv_id_from_url(url: &str) -> String {
    if let Some(pos) = url.rfind("/abs/") {
        url[pos + 5..].to_string()
    } else if let Some(pos) = url.rfind("/pdf/") {
        url[pos + 5..].trim_end_matches(".pdf").to_string()
    } else {
        url.rsplit('/').next().unwrap_or(url).to_string()
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_opensearch_value(xml: &str, field: &str) -> Option<usize> {
    extract_tag_text(xml, &format!("opensearch:{field}")).and_then(|s| s.parse().ok())
}

// ── ID Validation ─────────────────────────────────────────────

/// Validate that a string looks like an arXiv identifier.
/// Accepts the new format (YYMM.NNNNN) and the old one (category/NNNNNNN).
pub fn validate_arxiv_id(id: &str) -> Result<(), SearchError> {
    let id = id.trim();
    let reason = if id.is_empty() {
        "identifier is empty"
    } else if is_new_style_id(id) || is_old_style_id(id) {
        return Ok(());
    } else {
        "expected YYMM.NNNNN (e.g. 2301.12345) or category/NNNNNNN (e.g. hep-th/9901001)"
    };
    Err(SearchError::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    })
}

fn split_version(id: &str) -> Option<(&str, Option<&str>)> {
    match id.split_once('v') {
        Some((base, version)) => {
            if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                Some((base, Some(version)))
            }
        }
        None => Some((id, None)),
    }
}

fn is_new_style_id(id: &str) -> bool {
    let Some((base, _)) = split_version(id) else {
        return false;
    };
    let Some((yymm, number)) = base.split_once('.') else {
        return false;
    };
    yymm.len() == 4
        && yymm.chars().all(|c| c.is_ascii_digit())
        && (4..=5).contains(&number.len())
        && number.chars().all(|c| c.is_ascii_digit())
}

fn is_old_style_id(id: &str) -> bool {
    let Some((category, rest)) = id.split_once('/') else {
        return false;
    };
    let Some((number, _)) = split_version(rest) else {
        return false;
    };
    !category.is_empty()
        && category
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && number.len() == 7
        && number.chars().all(|c| c.is_ascii_digit())
}
