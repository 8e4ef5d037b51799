//! API request and response types

use crate::llm::{Turn, Usage};
use crate::skills::SkillSummary;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat` and `POST /api/chat/stream`
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub response_text: String,
    pub usage: Usage,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct SkillsResponse {
    pub skills: Vec<SkillSummary>,
}

#[derive(Debug, Serialize)]
pub struct GateStatus {
    pub capacity: usize,
    pub in_use: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub provider_gate: GateStatus,
    pub admission_gate: GateStatus,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            retry_after_secs: None,
        }
    }
}
