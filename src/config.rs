//! Service configuration read from the environment at startup

use crate::agent::DEFAULT_MAX_ROUNDS;
use crate::llm::LlmConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PROVIDER_CONCURRENCY: usize = 10;
pub const DEFAULT_HEAVY_MAX_IN_FLIGHT: usize = 15;
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    /// Concurrent model calls allowed across all conversations
    pub provider_max_concurrency: usize,
    /// Requests admitted to heavy endpoints at once
    pub heavy_max_in_flight: usize,
    pub retry_after: Duration,
    pub max_rounds: usize,
    /// Deadline for one non-streaming chat request
    pub request_timeout: Duration,
    pub memory_store_path: PathBuf,
    pub web_search_endpoint: Option<String>,
    pub llm: LlmConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> T {
            match lookup(key) {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
                    default
                }),
                None => default,
            }
        }

        let memory_store_path = lookup("MEMORY_STORE_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".tutor-agent").join("memory.json")
            },
            PathBuf::from,
        );

        let llm = LlmConfig {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()),
            gateway: lookup("LLM_GATEWAY").filter(|g| !g.is_empty()),
            model: lookup("DEFAULT_MODEL").filter(|m| !m.is_empty()),
            max_tokens: Some(parsed(&lookup, "LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS)),
        };

        Self {
            port: parsed(&lookup, "TUTOR_PORT", DEFAULT_PORT),
            provider_max_concurrency: parsed(
                &lookup,
                "PROVIDER_MAX_CONCURRENCY",
                DEFAULT_PROVIDER_CONCURRENCY,
            ),
            heavy_max_in_flight: parsed(&lookup, "HEAVY_MAX_IN_FLIGHT", DEFAULT_HEAVY_MAX_IN_FLIGHT),
            retry_after: Duration::from_secs(parsed(
                &lookup,
                "ADMISSION_RETRY_AFTER_SECS",
                DEFAULT_RETRY_AFTER_SECS,
            )),
            max_rounds: parsed(&lookup, "AGENT_MAX_ROUNDS", DEFAULT_MAX_ROUNDS),
            request_timeout: Duration::from_secs(parsed(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            memory_store_path,
            web_search_endpoint: lookup("WEB_SEARCH_ENDPOINT").filter(|e| !e.is_empty()),
            llm,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_max_concurrency == 0 {
            return Err(ConfigError::Zero("PROVIDER_MAX_CONCURRENCY"));
        }
        if self.heavy_max_in_flight == 0 {
            return Err(ConfigError::Zero("HEAVY_MAX_IN_FLIGHT"));
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::Zero("AGENT_MAX_ROUNDS"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Zero("REQUEST_TIMEOUT_SECS"));
        }
        Ok(())
    }
}
