//! Incremental events for streaming callers

use crate::llm::Usage;
use serde::Serialize;
use serde_json::Value;

/// Progress of one orchestration run.
///
/// A stream always ends with exactly one `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Sent first so a new caller learns the minted id
    Conversation { conversation_id: String },
    /// Text the model produced alongside tool requests
    AssistantText { text: String },
    ToolCall {
        call_id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        call_id: String,
        name: String,
        is_error: bool,
    },
    Done {
        conversation_id: String,
        response_text: String,
        usage: Usage,
    },
    /// Single classified `<CODE>: <detail>` string
    Error { message: String },
}

impl AgentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Conversation { .. } => "conversation",
            Self::AssistantText { .. } => "assistant_text",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
