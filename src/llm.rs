//! Model gateway
//!
//! A uniform interface to a language-model provider. The orchestrator only
//! ever talks to `dyn LlmService`; the Anthropic client is the production
//! implementation and tests substitute mocks.

mod anthropic;
mod error;
mod types;

pub use anthropic::AnthropicService;
pub use error::{LlmError, LlmErrorKind};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Default model when `DEFAULT_MODEL` is not set
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Configuration for the model provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    /// Base URL of an LLM gateway that proxies the Anthropic API
    pub gateway: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Build the production model service, wrapped with logging.
///
/// Without an API key (and no gateway) every call fails with an auth error
/// so the rest of the service still starts.
pub fn build_service(config: &LlmConfig) -> Result<Arc<dyn LlmService>, LlmError> {
    let model = config.model().to_string();

    // In gateway mode the gateway handles authentication
    let api_key = match (&config.anthropic_api_key, &config.gateway) {
        (Some(key), _) => key.clone(),
        (None, Some(_)) => "implicit".to_string(),
        (None, None) => {
            tracing::warn!("No LLM API key configured. Set ANTHROPIC_API_KEY or LLM_GATEWAY.");
            return Ok(Arc::new(UnconfiguredService { model_id: model }));
        }
    };

    let inner = AnthropicService::new(api_key, model, config.gateway.as_deref())?;
    Ok(Arc::new(LoggingService::new(Arc::new(inner))))
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    stop_reason = ?response.stop_reason,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    transient = e.kind.is_transient(),
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Stand-in used when no provider credentials are configured
struct UnconfiguredService {
    model_id: String,
}

#[async_trait]
impl LlmService for UnconfiguredService {
    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::auth("no API key configured"))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
