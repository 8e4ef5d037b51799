//! Orchestration errors

use crate::gate::GateError;
use crate::llm::LlmError;
use thiserror::Error;

/// Failures that halt a run.
///
/// Tool failures and unknown tools never show up here; they are reported to
/// the model in-band as error tool results.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("agent made {0} model calls without reaching a final answer")]
    RoundLimitExceeded(usize),

    #[error(transparent)]
    Gate(#[from] GateError),
}
