//! Property-based tests for error classification
//!
//! - Output is always one line of the form `<CODE>: <detail>`
//! - Classification is deterministic
//! - A recognized tool name always wins over provider keywords

use super::{classify, ErrorClassifier};
use proptest::prelude::*;

const CODES: &[&str] = &["TOOL_EXECUTION_FAILED", "LLM_PROVIDER_ERROR", "INTERNAL_ERROR"];

fn arb_raw() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 _.:\n\r\t-]{0,120}",
        Just("connection reset by peer".to_string()),
        Just("prompt is too long".to_string()),
        Just("web_search: upstream 500".to_string()),
        Just("content_filter triggered".to_string()),
    ]
}

proptest! {
    #[test]
    fn output_is_single_line_with_known_code(raw in arb_raw()) {
        let out = classify(&raw);
        prop_assert!(!out.contains('\n') && !out.contains('\r'), "{out:?}");
        let code = out.split(':').next().unwrap_or_default();
        prop_assert!(CODES.contains(&code), "{out:?}");
    }

    #[test]
    fn classification_is_deterministic(raw in arb_raw()) {
        let classifier = ErrorClassifier::new(["quiz_grader"]);
        prop_assert_eq!(classifier.classify(&raw), classifier.classify(&raw));
    }

    #[test]
    fn tool_name_beats_provider_terms(
        suffix in prop_oneof![
            Just("timed out"),
            Just("hit the token limit"),
            Just("blocked by moderation"),
        ]
    ) {
        let out = classify(&format!("rag_query {suffix}"));
        prop_assert!(out.starts_with("TOOL_EXECUTION_FAILED: rag_query"), "{out}");
    }
}
