//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use deepresearch_core::research::CitationLedger;
use deepresearch_core::research::strategy::{normalize_queries, split_queries};
use deepresearch_core::types::{Paper, preview, truncate_chars};

// --- Citation ledger properties ---

proptest! {
    #[test]
    fn ledger_ids_are_dense(urls in prop::collection::vec(0u8..20, 0..60)) {
        let mut ledger = CitationLedger::new();
        for u in &urls {
            ledger.register(Paper::new(format!("Paper {u}"), format!("http://arxiv.org/abs/{u}")));
        }
        let ids: Vec<usize> = ledger.iter().map(|c| c.id).collect();
        let expected: Vec<usize> = (1..=ledger.len()).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn ledger_ids_follow_first_registration(urls in prop::collection::vec(0u8..20, 1..60)) {
        let mut ledger = CitationLedger::new();
        let mut first_seen: Vec<u8> = Vec::new();
        for u in &urls {
            let id = ledger.register(Paper::new("t", format!("u{u}")));
            match first_seen.iter().position(|x| x == u) {
                Some(pos) => prop_assert_eq!(id, pos + 1),
                None => {
                    first_seen.push(*u);
                    prop_assert_eq!(id, first_seen.len());
                }
            }
        }
        prop_assert_eq!(ledger.len(), first_seen.len());
    }

    #[test]
    fn ledger_get_matches_iter(urls in prop::collection::vec(0u8..50, 0..40)) {
        let mut ledger = CitationLedger::new();
        for u in &urls {
            ledger.register(Paper::new("t", format!("u{u}")));
        }
        for citation in ledger.iter() {
            prop_assert_eq!(ledger.get(citation.id), Some(citation));
        }
        prop_assert!(ledger.get(ledger.len() + 1).is_none());
    }

    #[test]
    fn render_index_is_deterministic(urls in prop::collection::vec(0u8..20, 0..20), chars in 0usize..300) {
        let mut ledger = CitationLedger::new();
        for u in &urls {
            ledger.register(Paper::new("t", format!("u{u}")).with_snippet("s".repeat(usize::from(*u) * 10)));
        }
        let first = ledger.render_index(chars);
        prop_assert_eq!(&first, &ledger.render_index(chars));
        prop_assert_eq!(first.matches("**[citation:").count(), ledger.len());
    }
}

// --- Query normalization properties ---

proptest! {
    #[test]
    fn normalized_queries_are_bounded_and_unique(
        raw in prop::collection::vec("[a-z ]{0,12}", 0..20),
        max in 1usize..8,
    ) {
        let queries = normalize_queries(&raw, max);
        prop_assert!(queries.len() <= max);
        for (i, q) in queries.iter().enumerate() {
            prop_assert!(!q.is_empty());
            prop_assert_eq!(q.trim(), q.as_str());
            prop_assert!(!queries[i + 1..].contains(q));
        }
    }

    #[test]
    fn split_queries_never_yields_blanks(list in "[a-z |]{0,40}") {
        for q in split_queries(&list) {
            prop_assert!(!q.trim().is_empty());
            prop_assert!(!q.contains("||"));
        }
    }
}

// --- Text helper properties ---

proptest! {
    #[test]
    fn truncate_chars_never_exceeds_limit(text in "\\PC{0,200}", max in 0usize..250) {
        let cut = truncate_chars(&text, max);
        prop_assert!(cut.chars().count() <= max);
        prop_assert!(text.starts_with(cut));
    }

    #[test]
    fn preview_marks_only_truncated_text(text in "\\PC{0,200}", max in 0usize..250) {
        let shown = preview(&text, max);
        if text.chars().count() > max {
            prop_assert!(shown.ends_with("..."));
        } else {
            prop_assert_eq!(shown, text);
        }
    }
}
