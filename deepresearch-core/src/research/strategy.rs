//! Grammars for reading the model's query lists and continue/stop decisions.
//!
//! Two grammars are supported:
//!
//! - [`MarkerStrategy`]: the model ends its analysis with a line such as
//!   `Next queries: query one||query two`, or `Next queries: none` to stop.
//!   `后续查询：` is accepted as the marker too, and `无` as the stop word.
//! - [`ToolCallStrategy`]: the model emits an `arxiv_search` call in its
//!   special-token syntax,
//!   `<|tool▁calls▁begin|><|tool▁call▁begin|>arxiv_search<|tool▁sep|>{"queries":"a||b"}<|tool▁call▁end|><|tool▁calls▁end|>`.
//!   A response without a tool call means the model is done.

use crate::config::StrategyKind;
use crate::error::ResearchError;

/// Separator between queries in a query list.
pub const QUERY_DELIMITER: &str = "||";

const MARKERS: &[&str] = &["next queries:", "后续查询：", "后续查询:"];
const STOP_WORDS: &[&str] = &["none", "no", "n/a"];
const TRIM_CHARS: &[char] = &['"', '\'', '[', ']', '「', '」', '“', '”', '`'];

const CALLS_BEGIN: &str = "<|tool▁calls▁begin|>";
const CALLS_END: &str = "<|tool▁calls▁end|>";
const CALL_BEGIN: &str = "<|tool▁call▁begin|>";
const CALL_SEP: &str = "<|tool▁sep|>";
const CALL_END: &str = "<|tool▁call▁end|>";
const SEARCH_TOOL: &str = "arxiv_search";

/// What the model asked for after analyzing a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Run another round with these queries.
    Continue(Vec<String>),
    /// Stop searching and write the report.
    Done,
}

/// A parsed analysis response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// The model's analysis text, without the decision part.
    pub analysis: String,
    pub next: NextStep,
}

/// A grammar for model responses.
pub trait ResponseStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Output-format instructions appended to the first-queries prompt.
    fn query_instructions(&self) -> String;

    /// Output-format instructions appended to the analysis prompt.
    fn decision_instructions(&self) -> String;

    /// Extract raw queries from a first-queries response. May return
    /// blanks or duplicates; see [`normalize_queries`].
    fn parse_queries(&self, response: &str) -> Vec<String>;

    /// Extract the continue/stop decision from an analysis response.
    ///
    /// Returns `ResearchError::InvalidModelOutput` when the response does
    /// not follow the grammar.
    fn parse_decision(&self, response: &str) -> Result<Decision, ResearchError>;
}

/// Build the strategy selected in config.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn ResponseStrategy> {
    match kind {
        StrategyKind::Marker => Box::new(MarkerStrategy),
        StrategyKind::ToolCall => Box::new(ToolCallStrategy),
    }
}

/// Trim queries, drop blanks and duplicates, keep at most `max`.
pub fn normalize_queries<I, S>(raw: I, max: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for q in raw {
        if out.len() >= max {
            break;
        }
        let q = q.as_ref().trim().trim_matches(TRIM_CHARS).trim();
        if q.is_empty() || out.iter().any(|existing| existing == q) {
            continue;
        }
        out.push(q.to_string());
    }
    out
}

/// Split a `||`-delimited query list.
pub fn split_queries(list: &str) -> Vec<String> {
    list.trim()
        .trim_matches(TRIM_CHARS)
        .split(QUERY_DELIMITER)
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect()
}

/// Read a bare query-list response: the last line containing `||`, or the
/// first non-empty line when no line does.
fn parse_bare_queries(response: &str) -> Vec<String> {
    let lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let line = lines
        .iter()
        .rev()
        .find(|l| l.contains(QUERY_DELIMITER))
        .or_else(|| lines.first());
    line.map(|l| split_queries(l)).unwrap_or_default()
}

fn is_stop_line(line: &str) -> bool {
    let line = line
        .trim()
        .trim_matches(TRIM_CHARS)
        .trim_end_matches(['.', '。'])
        .trim();
    line.is_empty()
        || STOP_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
        || line.contains('无')
}

/// The `Next queries:` line grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerStrategy;

impl MarkerStrategy {
    /// Byte range of the last marker occurrence.
    fn find_marker(response: &str) -> Option<(usize, usize)> {
        // ASCII lowercasing keeps byte offsets aligned with `response`.
        let folded = response.to_ascii_lowercase();
        MARKERS
            .iter()
            .filter_map(|m| folded.rfind(m).map(|start| (start, start + m.len())))
            .max_by_key(|(start, _)| *start)
    }

    /// The query list following the marker: the rest of the marker's line,
    /// or the next non-empty line.
    fn list_after_marker(tail: &str) -> &str {
        tail.lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }

    fn strip_analysis_label(text: &str) -> String {
        let text = text.trim();
        let text = ["Analysis:", "analysis:", "分析：", "分析:"]
            .iter()
            .find_map(|label| text.strip_prefix(label))
            .unwrap_or(text);
        text.trim().to_string()
    }
}

impl ResponseStrategy for MarkerStrategy {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn query_instructions(&self) -> String {
        "Output format:\n\
         - Reply with the queries only, on a single line.\n\
         - Separate queries with \"||\", for example: deep learning||neural networks||transformer architecture\n\
         - Generate 1 to 5 queries."
            .to_string()
    }

    fn decision_instructions(&self) -> String {
        "Output format:\n\
         Analysis: <your analysis of the papers so far and your current answer to the question>\n\
         Next queries: <if the information is not yet sufficient, 2-3 new queries separated by \"||\"; otherwise write none>"
            .to_string()
    }

    fn parse_queries(&self, response: &str) -> Vec<String> {
        match Self::find_marker(response) {
            Some((_, end)) => {
                let list = Self::list_after_marker(&response[end..]);
                if is_stop_line(list) {
                    Vec::new()
                } else {
                    split_queries(list)
                }
            }
            None => parse_bare_queries(response),
        }
    }

    fn parse_decision(&self, response: &str) -> Result<Decision, ResearchError> {
        let (start, end) =
            Self::find_marker(response).ok_or_else(|| ResearchError::InvalidModelOutput {
                message: "response has no 'Next queries:' line".to_string(),
            })?;

        let analysis = Self::strip_analysis_label(&response[..start]);
        let list = Self::list_after_marker(&response[end..]);
        let next = if is_stop_line(list) {
            NextStep::Done
        } else {
            match split_queries(list) {
                queries if queries.is_empty() => NextStep::Done,
                queries => NextStep::Continue(queries),
            }
        };
        Ok(Decision { analysis, next })
    }
}

/// The `arxiv_search` tool-call grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCallStrategy;

impl ToolCallStrategy {
    /// Every `(name, arguments)` pair inside tool-call blocks.
    fn extract_calls(response: &str) -> Vec<(&str, &str)> {
        let mut calls = Vec::new();
        let mut rest = response;
        while let Some(begin) = rest.find(CALLS_BEGIN) {
            let after = &rest[begin + CALLS_BEGIN.len()..];
            let (block, remaining) = match after.find(CALLS_END) {
                Some(end) => (&after[..end], &after[end + CALLS_END.len()..]),
                None => (after, ""),
            };
            let mut block_rest = block;
            while let Some(cb) = block_rest.find(CALL_BEGIN) {
                let call = &block_rest[cb + CALL_BEGIN.len()..];
                let Some(sep) = call.find(CALL_SEP) else {
                    break;
                };
                let name = call[..sep].trim();
                let args_start = &call[sep + CALL_SEP.len()..];
                let (args, next) = match args_start.find(CALL_END) {
                    Some(e) => (&args_start[..e], &args_start[e + CALL_END.len()..]),
                    None => (args_start, ""),
                };
                calls.push((name, args.trim()));
                block_rest = next;
            }
            rest = remaining;
        }
        calls
    }

    fn queries_from_args(args: &str) -> Result<Vec<String>, ResearchError> {
        let value: serde_json::Value =
            serde_json::from_str(args).map_err(|e| ResearchError::InvalidModelOutput {
                message: format!("tool call arguments are not valid JSON: {e}"),
            })?;
        match value.get("queries") {
            Some(serde_json::Value::String(list)) => Ok(split_queries(list)),
            Some(serde_json::Value::Array(items)) => Ok(items
                .iter()
                .filter_map(|v| v.as_str())
                .flat_map(split_queries)
                .collect()),
            _ => Err(ResearchError::InvalidModelOutput {
                message: "tool call arguments have no 'queries' field".to_string(),
            }),
        }
    }

    fn search_queries(response: &str) -> Result<Option<Vec<String>>, ResearchError> {
        let calls: Vec<_> = Self::extract_calls(response)
            .into_iter()
            .filter(|(name, _)| *name == SEARCH_TOOL)
            .collect();
        if calls.is_empty() {
            return Ok(None);
        }
        let mut queries = Vec::new();
        for (_, args) in calls {
            queries.extend(Self::queries_from_args(args)?);
        }
        Ok(Some(queries))
    }

    fn tool_spec() -> String {
        format!(
            "You have access to the following tool:\n\
             Tool: {SEARCH_TOOL}\n\
             Description: search arXiv for academic papers.\n\
             Parameters: {{\"type\": \"object\", \"properties\": {{\"queries\": {{\"type\": \"string\", \
             \"description\": \"Up to 5 arXiv search queries separated by \\\"||\\\", for example \\\"deep learning||neural networks\\\". \
             Use academic English terminology, keep each query focused, and do not repeat queries that were already searched.\"}}}}, \"required\": [\"queries\"]}}\n\n\
             Always use this exact format for tool use:\n\
             {CALLS_BEGIN}{CALL_BEGIN}{SEARCH_TOOL}{CALL_SEP}{{\"queries\": \"query one||query two\"}}{CALL_END}{CALLS_END}"
        )
    }
}

impl ResponseStrategy for ToolCallStrategy {
    fn name(&self) -> &'static str {
        "tool_call"
    }

    fn query_instructions(&self) -> String {
        format!(
            "{}\n\nCall {SEARCH_TOOL} once with 1 to 5 queries and write nothing else.",
            Self::tool_spec()
        )
    }

    fn decision_instructions(&self) -> String {
        format!(
            "{}\n\nFirst write your analysis of the papers so far. If more searching is needed, \
             finish with one {SEARCH_TOOL} call containing 2-3 new queries. \
             If the information is sufficient, do not call any tool.",
            Self::tool_spec()
        )
    }

    fn parse_queries(&self, response: &str) -> Vec<String> {
        match Self::search_queries(response) {
            Ok(Some(queries)) => queries,
            Ok(None) => parse_bare_queries(response),
            Err(e) => {
                tracing::debug!(error = %e, "Malformed tool call; no queries taken from it");
                Vec::new()
            }
        }
    }

    fn parse_decision(&self, response: &str) -> Result<Decision, ResearchError> {
        let analysis = match response.find(CALLS_BEGIN) {
            Some(idx) => response[..idx].trim().to_string(),
            None => response.trim().to_string(),
        };
        let next = match Self::search_queries(response)? {
            Some(queries) if !queries.is_empty() => NextStep::Continue(queries),
            _ => NextStep::Done,
        };
        Ok(Decision { analysis, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_queries() {
        let raw = [" a ", "", "b", "a", "\"c\"", "d", "e", "f"];
        assert_eq!(normalize_queries(raw, 5), strings(&["a", "b", "c", "d", "e"]));
        assert!(normalize_queries(["  ", ""], 5).is_empty());
    }

    #[test]
    fn test_normalize_queries_zero_cap() {
        let raw = ["a", "b", "c", "d", "e", "f", "g"];
        assert!(normalize_queries(raw, 0).is_empty());
        assert_eq!(normalize_queries(raw, 1), strings(&["a"]));
    }

    #[test]
    fn test_split_queries() {
        assert_eq!(
            split_queries("\"deep learning||neural networks|| \""),
            strings(&["deep learning", "neural networks"])
        );
    }

    #[test]
    fn test_marker_parse_queries_bare_line() {
        let s = MarkerStrategy;
        assert_eq!(
            s.parse_queries("Here are my queries:\nself attention||transformer architecture\n"),
            strings(&["self attention", "transformer architecture"])
        );
        assert_eq!(s.parse_queries("attention mechanism"), strings(&["attention mechanism"]));
        assert!(s.parse_queries("").is_empty());
    }

    #[test]
    fn test_marker_parse_queries_with_marker() {
        let s = MarkerStrategy;
        assert_eq!(
            s.parse_queries("Some thoughts.\nNext queries: a||b"),
            strings(&["a", "b"])
        );
        assert!(s.parse_queries("Next queries: none").is_empty());
    }

    #[test]
    fn test_marker_decision_continue() {
        let response = "Analysis: The papers cover sparse attention.\n\nNext queries: linear attention||flash attention";
        let decision = MarkerStrategy.parse_decision(response).unwrap();
        assert_eq!(decision.analysis, "The papers cover sparse attention.");
        assert_eq!(
            decision.next,
            NextStep::Continue(strings(&["linear attention", "flash attention"]))
        );
    }

    #[test]
    fn test_marker_decision_case_insensitive_next_line() {
        let response = "analysis text\nNEXT QUERIES:\n\n  \"rope||alibi\"";
        let decision = MarkerStrategy.parse_decision(response).unwrap();
        assert_eq!(decision.next, NextStep::Continue(strings(&["rope", "alibi"])));
    }

    #[test]
    fn test_marker_decision_stop_words() {
        for tail in ["none", "None.", "N/A", "no", "[无]", "无需继续搜索", ""] {
            let response = format!("Analysis: done\nNext queries: {tail}");
            let decision = MarkerStrategy.parse_decision(&response).unwrap();
            assert_eq!(decision.next, NextStep::Done, "tail: {tail:?}");
        }
    }

    #[test]
    fn test_marker_decision_chinese_marker() {
        let response = "分析：已有足够信息。\n后续查询：无";
        let decision = MarkerStrategy.parse_decision(response).unwrap();
        assert_eq!(decision.analysis, "已有足够信息。");
        assert_eq!(decision.next, NextStep::Done);

        let response = "分析：需要更多。\n后续查询:稀疏注意力||长上下文";
        let decision = MarkerStrategy.parse_decision(response).unwrap();
        assert_eq!(
            decision.next,
            NextStep::Continue(strings(&["稀疏注意力", "长上下文"]))
        );
    }

    #[test]
    fn test_marker_decision_missing_marker() {
        let err = MarkerStrategy.parse_decision("just some prose").unwrap_err();
        assert!(matches!(err, ResearchError::InvalidModelOutput { .. }));
    }

    #[test]
    fn test_tool_call_decision_continue() {
        let response = "The papers are relevant but incomplete.\n<|tool▁calls▁begin|><|tool▁call▁begin|>arxiv_search<|tool▁sep|>{\"queries\": \"mixture of experts||expert routing\"}<|tool▁call▁end|><|tool▁calls▁end|>";
        let decision = ToolCallStrategy.parse_decision(response).unwrap();
        assert_eq!(decision.analysis, "The papers are relevant but incomplete.");
        assert_eq!(
            decision.next,
            NextStep::Continue(strings(&["mixture of experts", "expert routing"]))
        );
    }

    #[test]
    fn test_tool_call_multiple_calls() {
        let response = "<|tool▁calls▁begin|>\
            <|tool▁call▁begin|>arxiv_search<|tool▁sep|>{\"queries\": \"a\"}<|tool▁call▁end|>\
            <|tool▁call▁begin|>other_tool<|tool▁sep|>{}<|tool▁call▁end|>\
            <|tool▁call▁begin|>arxiv_search<|tool▁sep|>{\"queries\": \"b||c\"}<|tool▁call▁end|>\
            <|tool▁calls▁end|>";
        let decision = ToolCallStrategy.parse_decision(response).unwrap();
        assert_eq!(decision.next, NextStep::Continue(strings(&["a", "b", "c"])));
    }

    #[test]
    fn test_tool_call_absent_means_done() {
        let decision = ToolCallStrategy
            .parse_decision("Final answer: attention is a weighting scheme.")
            .unwrap();
        assert_eq!(decision.next, NextStep::Done);
        assert_eq!(decision.analysis, "Final answer: attention is a weighting scheme.");
    }

    #[test]
    fn test_tool_call_bad_json() {
        let response = "<|tool▁calls▁begin|><|tool▁call▁begin|>arxiv_search<|tool▁sep|>{queries: oops}<|tool▁call▁end|><|tool▁calls▁end|>";
        let err = ToolCallStrategy.parse_decision(response).unwrap_err();
        assert!(matches!(err, ResearchError::InvalidModelOutput { .. }));
    }

    #[test]
    fn test_tool_call_parse_queries_bad_json_yields_nothing() {
        let response = "<|tool▁calls▁begin|><|tool▁call▁begin|>arxiv_search<|tool▁sep|>{queries: oops}<|tool▁call▁end|><|tool▁calls▁end|>";
        assert!(ToolCallStrategy.parse_queries(response).is_empty());
    }

    #[test]
    fn test_tool_call_parse_queries_falls_back_to_bare() {
        assert_eq!(
            ToolCallStrategy.parse_queries("rope||alibi"),
            strings(&["rope", "alibi"])
        );
    }

    #[test]
    fn test_strategy_for() {
        assert_eq!(strategy_for(StrategyKind::Marker).name(), "marker");
        assert_eq!(strategy_for(StrategyKind::ToolCall).name(), "tool_call");
    }

    #[test]
    fn test_instructions_mention_grammar() {
        assert!(MarkerStrategy.decision_instructions().contains("Next queries:"));
        assert!(ToolCallStrategy.decision_instructions().contains(CALL_SEP));
    }
}
