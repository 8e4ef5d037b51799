//! Mock implementations for testing
//!
//! These mocks drive the orchestrator without network I/O.

use crate::llm::{
    ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, StopReason, Usage,
};
use crate::skills::{Skill, SkillError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Response builders
// ============================================================================

fn mock_usage() -> Usage {
    Usage {
        input_tokens: 10,
        output_tokens: 5,
    }
}

/// Final answer made of one text block per chunk
pub fn text_response(chunks: &[&str]) -> LlmResponse {
    LlmResponse {
        content: chunks.iter().map(|c| ContentBlock::text(*c)).collect(),
        stop_reason: StopReason::EndTurn,
        usage: mock_usage(),
    }
}

/// Tool request turn with one `tool_use` block per `(id, name, input)`
pub fn tool_use_response(calls: &[(&str, &str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::tool_use(*id, *name, input.clone()))
            .collect(),
        stop_reason: StopReason::ToolUse,
        usage: mock_usage(),
    }
}

// ============================================================================
// Mock LLM services
// ============================================================================

/// Returns queued responses in order
#[derive(Default)]
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    fallback: Option<LlmResponse>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response returned once the queue runs dry
    pub fn with_fallback(mut self, response: LlmResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let queued = self.responses.lock().unwrap().pop_front();
        match (queued, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(LlmError::network("No mock response queued")),
        }
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

/// Answers "done" after a delay, tracking how many calls overlap
pub struct SlowLlmService {
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowLlmService {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmService for SlowLlmService {
    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        Ok(text_response(&["done"]))
    }

    fn model_id(&self) -> &str {
        "slow-mock-model"
    }
}

// ============================================================================
// Mock skills
// ============================================================================

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Always returns the same output, recording every input
pub struct StaticSkill {
    name: String,
    output: String,
    inputs: Mutex<Vec<Value>>,
}

impl StaticSkill {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_inputs(&self) -> Vec<Value> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Skill for StaticSkill {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, input: Value) -> Result<String, SkillError> {
        self.inputs.lock().unwrap().push(input);
        Ok(self.output.clone())
    }
}

/// Always fails with the given message
pub struct FailingSkill {
    name: String,
    message: String,
}

impl FailingSkill {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Skill for FailingSkill {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value) -> Result<String, SkillError> {
        Err(SkillError::Failed(self.message.clone()))
    }
}

/// Panics when executed
pub struct PanickingSkill {
    name: String,
}

impl PanickingSkill {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Skill for PanickingSkill {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value) -> Result<String, SkillError> {
        panic!("{} blew up", self.name);
    }
}

/// Sleeps before returning its own name
pub struct SlowSkill {
    name: String,
    delay: Duration,
}

impl SlowSkill {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl Skill for SlowSkill {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value) -> Result<String, SkillError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("{} finished", self.name))
    }
}
