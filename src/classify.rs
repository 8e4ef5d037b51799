//! Error classification for streaming clients
//!
//! Turns raw failure text into one single-line `<CODE>: <detail>` string.
//! Rules are checked in a fixed order and the first match wins:
//! tool failures, then provider failures, then the internal fallback.

#[cfg(test)]
mod proptests;

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Skill names recognized even when they are not registered in this process
const KNOWN_TOOLS: &[&str] = &[
    "web_search",
    "memory_store",
    "generate_quiz_questions",
    "rag_query",
    "rag_insert",
    "summarize_document",
];

/// Generic tool-name families, for skills added after this list was written
static TOOL_FAMILY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?:generate|search|fetch|create|update|delete|list|lookup|query|send|run)_[a-z0-9_]+|[a-z0-9]+(?:_[a-z0-9]+)*_(?:tool|skill))\b",
    )
    .expect("tool family pattern is valid")
});

/// Phrases that point at the tool layer without naming a tool
const TOOL_HINTS: &[&str] = &[
    "tool execution",
    "tool failed",
    "tool error",
    "skill failed",
    "skill error",
    "error executing",
];

const CONTENT_FILTER_TERMS: &[&str] = &[
    "content filter",
    "content_filter",
    "content policy",
    "safety",
    "moderation",
];

const CONTEXT_LENGTH_TERMS: &[&str] = &[
    "context length",
    "context_length",
    "context window",
    "maximum context",
    "prompt is too long",
    "too many tokens",
    "token limit",
];

const UNAVAILABLE_TERMS: &[&str] = &[
    "timeout",
    "timed out",
    "deadline",
    "connect",
    "network",
    "rate limit",
    "overloaded",
    "unavailable",
];

const CONTENT_FILTERED_PHRASE: &str = "the response was blocked by the provider's safety system";

/// Closed set of error categories surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// `None` when only a generic tool-layer hint matched
    ToolExecutionFailed { tool: Option<String> },
    ModelProvider(ProviderFailure),
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    ContentFiltered,
    ContextLength,
    Unavailable,
}

impl ErrorCategory {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ToolExecutionFailed { .. } => "TOOL_EXECUTION_FAILED",
            Self::ModelProvider(_) => "LLM_PROVIDER_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// A classified failure; `Display` renders the transport string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub category: ErrorCategory,
    pub detail: String,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.category.code();
        match &self.category {
            ErrorCategory::ToolExecutionFailed { tool } => {
                let tool = tool.as_deref().unwrap_or("unknown_tool");
                write!(f, "{code}: {tool} — {}", self.detail)
            }
            ErrorCategory::ModelProvider(ProviderFailure::ContentFiltered) => {
                write!(f, "{code}: content filtered — {CONTENT_FILTERED_PHRASE}")
            }
            ErrorCategory::ModelProvider(ProviderFailure::ContextLength) => {
                write!(f, "{code}: context length exceeded — {}", self.detail)
            }
            ErrorCategory::ModelProvider(ProviderFailure::Unavailable) => {
                write!(f, "{code}: provider unavailable — {}", self.detail)
            }
            ErrorCategory::Internal => write!(f, "{code}: {}", self.detail),
        }
    }
}

/// Classifier with a tool vocabulary.
///
/// The default vocabulary is [`KNOWN_TOOLS`]; the service extends it with the
/// names of every registered skill.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    vocabulary: Vec<String>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl ErrorClassifier {
    pub fn new<'a>(extra_tools: impl IntoIterator<Item = &'a str>) -> Self {
        let mut vocabulary: Vec<String> = KNOWN_TOOLS.iter().map(|s| (*s).to_string()).collect();
        for name in extra_tools {
            let name = name.to_lowercase();
            if !vocabulary.contains(&name) {
                vocabulary.push(name);
            }
        }
        // Prefer the most specific name when one contains another
        vocabulary.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { vocabulary }
    }

    pub fn record(&self, raw: &str) -> ErrorRecord {
        let detail = single_line(raw);
        let lowered = detail.to_lowercase();

        let category = if let Some(tool) = self.find_tool(&lowered) {
            ErrorCategory::ToolExecutionFailed { tool: Some(tool) }
        } else if contains_any(&lowered, TOOL_HINTS) {
            ErrorCategory::ToolExecutionFailed { tool: None }
        } else if contains_any(&lowered, CONTENT_FILTER_TERMS) {
            ErrorCategory::ModelProvider(ProviderFailure::ContentFiltered)
        } else if contains_any(&lowered, CONTEXT_LENGTH_TERMS) {
            ErrorCategory::ModelProvider(ProviderFailure::ContextLength)
        } else if contains_any(&lowered, UNAVAILABLE_TERMS) {
            ErrorCategory::ModelProvider(ProviderFailure::Unavailable)
        } else {
            ErrorCategory::Internal
        };

        ErrorRecord { category, detail }
    }

    /// Classify and render in one step
    pub fn classify(&self, raw: &str) -> String {
        self.record(raw).to_string()
    }

    fn find_tool(&self, lowered: &str) -> Option<String> {
        self.vocabulary
            .iter()
            .find(|name| contains_word(lowered, name))
            .cloned()
            .or_else(|| TOOL_FAMILY.find(lowered).map(|m| m.as_str().to_string()))
    }
}

/// Classify with the built-in vocabulary only
pub fn classify(raw: &str) -> String {
    ErrorClassifier::default().classify(raw)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Substring match that refuses to land inside a longer identifier
fn contains_word(haystack: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack.get(..start).and_then(|s| s.chars().next_back());
        let after = haystack
            .get(start + word.len()..)
            .and_then(|s| s.chars().next());
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

fn single_line(raw: &str) -> String {
    let joined = raw
        .split(|c: char| c == '\n' || c == '\r')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        "unknown error".to_string()
    } else {
        joined
    }
}
