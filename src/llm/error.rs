//! Model gateway errors

use std::time::Duration;
use thiserror::Error;

/// Failure of an outbound model call, tagged with a coarse kind.
///
/// The message is what ends up in front of the error classifier, so
/// constructors prefix it with words the classifier keys on ("timeout",
/// "context length", "content filter").
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn timeout(detail: impl std::fmt::Display) -> Self {
        Self::new(LlmErrorKind::Timeout, format!("Request timeout: {detail}"))
    }

    pub fn network(detail: impl std::fmt::Display) -> Self {
        Self::new(LlmErrorKind::Network, format!("Connection failed: {detail}"))
    }

    pub fn rate_limit(detail: impl std::fmt::Display) -> Self {
        Self::new(LlmErrorKind::RateLimit, format!("Rate limited: {detail}"))
    }

    pub fn server_error(detail: impl std::fmt::Display) -> Self {
        Self::new(LlmErrorKind::ServerError, format!("Server error: {detail}"))
    }

    pub fn auth(detail: impl std::fmt::Display) -> Self {
        Self::new(
            LlmErrorKind::Auth,
            format!("Authentication failed: {detail}"),
        )
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self::new(
            LlmErrorKind::InvalidRequest,
            format!("Invalid request: {detail}"),
        )
    }

    pub fn content_filter(detail: impl std::fmt::Display) -> Self {
        Self::new(
            LlmErrorKind::ContentFilter,
            format!("Blocked by content filter: {detail}"),
        )
    }

    pub fn context_length(detail: impl std::fmt::Display) -> Self {
        Self::new(
            LlmErrorKind::ContextLength,
            format!("Context length exceeded: {detail}"),
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }
}

/// Error classification for the model call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    Timeout,
    /// Connect or transport failure
    Network,
    /// 429 from the provider
    RateLimit,
    /// 5xx / overloaded
    ServerError,
    /// 401, 403, or no API key configured
    Auth,
    /// 400 that is not one of the more specific cases below
    InvalidRequest,
    ContentFilter,
    ContextLength,
    Unknown,
}

impl LlmErrorKind {
    /// Whether a caller could reasonably retry. Nothing in this crate retries.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Network | Self::RateLimit | Self::ServerError
        )
    }
}
