//! Conversation orchestrator
//!
//! Drives the tool-use loop for one user message:
//!
//! 1. append the user turn
//! 2. call the model (holding a provider gate permit)
//! 3. append the assistant turn
//! 4. if the model asked for tools, run them all, append one user turn with
//!    every result, and go back to 2; otherwise return the final text
//!
//! New turns are staged for the length of a run and committed to the
//! conversation when the run returns, successfully or with an error. A run
//! that is cancelled mid-flight (its future dropped) commits nothing, so the
//! stored history never holds a `tool_use` without its `tool_result`.

mod conversation;
mod error;
mod event;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use conversation::{Conversation, ConversationGuard, ConversationStore};
pub use error::AgentError;
pub use event::AgentEvent;

use crate::classify::ErrorClassifier;
use crate::gate::ConcurrencyGate;
use crate::llm::{
    ContentBlock, LlmRequest, LlmResponse, LlmService, SystemContent, ToolCall, ToolDefinition,
    Turn, Usage,
};
use crate::skills::{DispatchError, SkillRegistry};
use crate::system_prompt::build_system_prompt;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Default cap on model calls per run
pub const DEFAULT_MAX_ROUNDS: usize = 25;

/// Tunables for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_rounds: usize,
    pub max_tokens: Option<u32>,
    /// Overrides the generated system prompt when set
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_tokens: None,
            system_prompt: None,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub conversation_id: String,
    pub response_text: String,
    pub usage: Usage,
}

pub struct Orchestrator {
    llm: Arc<dyn LlmService>,
    skills: Arc<SkillRegistry>,
    declarations: Vec<ToolDefinition>,
    system_prompt: String,
    provider_gate: ConcurrencyGate,
    conversations: ConversationStore,
    classifier: ErrorClassifier,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmService>,
        skills: Arc<SkillRegistry>,
        provider_gate: ConcurrencyGate,
        config: OrchestratorConfig,
    ) -> Self {
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| build_system_prompt(&skills));
        let classifier = ErrorClassifier::new(skills.names());

        Self {
            declarations: skills.declarations(),
            llm,
            skills,
            system_prompt,
            provider_gate,
            conversations: ConversationStore::new(),
            classifier,
            config,
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    pub fn provider_gate(&self) -> &ConcurrencyGate {
        &self.provider_gate
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Render an error as the single-line string sent to clients
    pub fn classify(&self, error: &AgentError) -> String {
        self.classifier.classify(&error.to_string())
    }

    /// Run one user message to a final answer
    pub async fn run(
        &self,
        conversation_id: Option<String>,
        user_message: &str,
    ) -> Result<RunOutcome, AgentError> {
        self.run_inner(conversation_id, user_message, None).await
    }

    /// Like [`run`](Self::run), reporting progress on `events`.
    ///
    /// The last event sent is always `Done` or `Error`. A closed receiver
    /// does not stop the run.
    pub async fn run_streaming(
        &self,
        conversation_id: Option<String>,
        user_message: &str,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Result<RunOutcome, AgentError> {
        let result = self
            .run_inner(conversation_id, user_message, Some(events))
            .await;

        let terminal = match &result {
            Ok(outcome) => AgentEvent::Done {
                conversation_id: outcome.conversation_id.clone(),
                response_text: outcome.response_text.clone(),
                usage: outcome.usage,
            },
            Err(e) => AgentEvent::Error {
                message: self.classify(e),
            },
        };
        emit(Some(events), terminal).await;

        result
    }

    async fn run_inner(
        &self,
        conversation_id: Option<String>,
        user_message: &str,
        events: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<RunOutcome, AgentError> {
        if user_message.trim().is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let mut conversation = self.conversations.checkout(conversation_id).await;
        let conv_id = conversation.id().to_string();
        emit(
            events,
            AgentEvent::Conversation {
                conversation_id: conv_id.clone(),
            },
        )
        .await;

        let mut pending = vec![Turn::user_text(user_message)];
        let result = self
            .drive(&conv_id, conversation.turns(), &mut pending, events)
            .await;

        conversation.extend(pending);

        let (response_text, usage) = result?;
        Ok(RunOutcome {
            conversation_id: conv_id,
            response_text,
            usage,
        })
    }

    /// The CALL_MODEL / BRANCH loop over staged turns
    async fn drive(
        &self,
        conv_id: &str,
        committed: &[Turn],
        pending: &mut Vec<Turn>,
        events: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<(String, Usage), AgentError> {
        let mut usage = Usage::default();

        for round in 1..=self.config.max_rounds {
            let history: Vec<Turn> = committed.iter().chain(pending.iter()).cloned().collect();
            let response = self.call_model(conv_id, round, history).await?;
            usage.add(response.usage);

            let wants_tools = response.wants_tools();
            let assistant = Turn::assistant(response.content);

            if !wants_tools {
                let text = assistant.text();
                pending.push(assistant);
                tracing::info!(
                    conv_id,
                    rounds = round,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "Conversation turn complete"
                );
                return Ok((text, usage));
            }

            let interim = assistant.text();
            if !interim.is_empty() {
                emit(events, AgentEvent::AssistantText { text: interim }).await;
            }

            let results = self.execute_tools(conv_id, &assistant, events).await;
            pending.push(assistant);
            pending.push(Turn::user(results));
        }

        tracing::warn!(
            conv_id,
            max_rounds = self.config.max_rounds,
            "Round limit reached without a final answer"
        );
        Err(AgentError::RoundLimitExceeded(self.config.max_rounds))
    }

    async fn call_model(
        &self,
        conv_id: &str,
        round: usize,
        messages: Vec<Turn>,
    ) -> Result<LlmResponse, AgentError> {
        let request = LlmRequest {
            system: vec![SystemContent::cached(self.system_prompt.clone())],
            messages,
            tools: self.declarations.clone(),
            max_tokens: self.config.max_tokens,
        };

        let permit = self.provider_gate.acquire().await?;
        tracing::debug!(
            conv_id,
            round,
            in_flight = self.provider_gate.in_use(),
            "Calling model"
        );
        let result = self.llm.complete(&request).await;
        permit.release();

        Ok(result?)
    }

    /// Run every tool request in `assistant` concurrently.
    ///
    /// Returns one result block per request, in request order.
    async fn execute_tools(
        &self,
        conv_id: &str,
        assistant: &Turn,
        events: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Vec<ContentBlock> {
        let calls: Vec<ToolCall<'_>> = assistant.tool_uses().collect();

        for call in &calls {
            emit(
                events,
                AgentEvent::ToolCall {
                    call_id: call.id.to_string(),
                    name: call.name.to_string(),
                    input: call.input.clone(),
                },
            )
            .await;
        }

        let results =
            futures::future::join_all(calls.iter().map(|call| self.execute_tool(conv_id, *call)))
                .await;

        for (call, result) in calls.iter().zip(&results) {
            let is_error = matches!(result, ContentBlock::ToolResult { is_error: true, .. });
            emit(
                events,
                AgentEvent::ToolResult {
                    call_id: call.id.to_string(),
                    name: call.name.to_string(),
                    is_error,
                },
            )
            .await;
        }

        results
    }

    /// EXECUTE_TOOL: never fails; problems become error results
    async fn execute_tool(&self, conv_id: &str, call: ToolCall<'_>) -> ContentBlock {
        let start = Instant::now();
        let dispatch = self.skills.dispatch(call.name, call.input.clone());

        let (content, is_error) = match AssertUnwindSafe(dispatch).catch_unwind().await {
            Ok(Ok(output)) => (output, false),
            Ok(Err(DispatchError::UnknownSkill(name))) => {
                (format!("Error: unknown tool '{name}'"), true)
            }
            Ok(Err(DispatchError::Failed { name, source })) => {
                (format!("Error executing {name}: {source}"), true)
            }
            Err(_) => (format!("Error executing {}: skill panicked", call.name), true),
        };

        if is_error {
            tracing::warn!(
                conv_id,
                tool = call.name,
                call_id = call.id,
                duration_ms = %start.elapsed().as_millis(),
                error = %content,
                "Tool failed"
            );
        } else {
            tracing::info!(
                conv_id,
                tool = call.name,
                call_id = call.id,
                duration_ms = %start.elapsed().as_millis(),
                "Tool completed"
            );
        }

        ContentBlock::tool_result(call.id, content, is_error)
    }
}

async fn emit(events: Option<&mpsc::Sender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        // A departed listener is not the run's problem
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::llm::{LlmError, Role};
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    fn orchestrator(llm: Arc<dyn LlmService>, skills: SkillRegistry) -> Orchestrator {
        Orchestrator::new(
            llm,
            Arc::new(skills),
            ConcurrencyGate::new("provider", 10),
            OrchestratorConfig::default(),
        )
    }

    fn skills(list: Vec<Arc<dyn crate::skills::Skill>>) -> SkillRegistry {
        let mut registry = SkillRegistry::new();
        for skill in list {
            registry.register(skill).unwrap();
        }
        registry
    }

    fn tool_results(turn: &Turn) -> Vec<(String, String, bool)> {
        turn.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => Some((tool_use_id.clone(), content.clone(), *is_error)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_web_search_end_to_end() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_response(tool_use_response(&[(
            "toolu_1",
            "web_search",
            json!({"query": "X"}),
        )]));
        llm.queue_response(text_response(&["X is ", "a thing."]));

        let search = Arc::new(StaticSkill::new("web_search", "X: a thing (example.com)"));
        let orch = orchestrator(llm.clone(), skills(vec![search.clone()]));

        let outcome = orch.run(None, "search the web for X").await.unwrap();
        assert_eq!(outcome.response_text, "X is a thing.");
        assert_eq!(outcome.usage.input_tokens, 20);
        assert_eq!(outcome.usage.output_tokens, 10);

        assert_eq!(search.recorded_inputs(), vec![json!({"query": "X"})]);

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].tools[0].name, "web_search");
        assert!(requests[0].system[0].text.contains("web_search"));

        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(
            tool_results(&second[2]),
            vec![(
                "toolu_1".to_string(),
                "X: a thing (example.com)".to_string(),
                false
            )]
        );

        let turns = orch
            .conversations()
            .snapshot(&outcome.conversation_id)
            .await
            .unwrap();
        let roles: Vec<_> = turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_every_tool_use_gets_one_matching_result() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_response(tool_use_response(&[
            ("a", "slow_lookup", json!({})),
            ("b", "web_search", json!({"query": "q"})),
            ("c", "nonexistent", json!({})),
        ]));
        llm.queue_response(text_response(&["done"]));

        let orch = orchestrator(
            llm.clone(),
            skills(vec![
                Arc::new(SlowSkill::new("slow_lookup", Duration::from_millis(50))),
                Arc::new(StaticSkill::new("web_search", "hits")),
            ]),
        );
        let outcome = orch.run(None, "do three things").await.unwrap();

        let turns = orch
            .conversations()
            .snapshot(&outcome.conversation_id)
            .await
            .unwrap();
        let requested: Vec<_> = turns[1].tool_uses().map(|c| c.id.to_string()).collect();
        let answered: Vec<_> = tool_results(&turns[2])
            .into_iter()
            .map(|(id, _, _)| id)
            .collect();

        // Same ids, same order, each exactly once, even though the first
        // tool finished last
        assert_eq!(requested, answered);
        assert_eq!(answered.iter().collect::<HashSet<_>>().len(), 3);
        assert_eq!(turns[2].content.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_and_loop_continues() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_response(tool_use_response(&[("t1", "teleport", json!({}))]));
        llm.queue_response(text_response(&["I can't teleport."]));

        let orch = orchestrator(llm.clone(), SkillRegistry::new());
        let outcome = orch.run(None, "beam me up").await.unwrap();
        assert_eq!(outcome.response_text, "I can't teleport.");

        let requests = llm.recorded_requests();
        let results = tool_results(&requests[1].messages[2]);
        assert_eq!(results.len(), 1);
        assert!(results[0].1.contains("unknown tool"));
        assert_eq!(results[0].1, "Error: unknown tool 'teleport'");
        assert!(results[0].2);
    }

    #[tokio::test]
    async fn test_failing_skill_does_not_abort_run() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_response(tool_use_response(&[
            ("t1", "generate_quiz_questions", json!({"topic": "graphs"})),
            ("t2", "web_search", json!({"query": "graphs"})),
        ]));
        llm.queue_response(text_response(&["Here is what I found."]));

        let orch = orchestrator(
            llm.clone(),
            skills(vec![
                Arc::new(FailingSkill::new("generate_quiz_questions", "bad schema")),
                Arc::new(StaticSkill::new("web_search", "graph theory basics")),
            ]),
        );
        let outcome = orch.run(None, "quiz me").await.unwrap();
        assert_eq!(outcome.response_text, "Here is what I found.");

        let results = tool_results(&llm.recorded_requests()[1].messages[2]);
        assert_eq!(
            results[0],
            (
                "t1".to_string(),
                "Error executing generate_quiz_questions: bad schema".to_string(),
                true
            )
        );
        assert_eq!(
            results[1],
            ("t2".to_string(), "graph theory basics".to_string(), false)
        );
    }

    #[tokio::test]
    async fn test_panicking_skill_is_contained() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_response(tool_use_response(&[("t1", "flaky", json!({}))]));
        llm.queue_response(text_response(&["recovered"]));

        let orch = orchestrator(llm.clone(), skills(vec![Arc::new(PanickingSkill::new("flaky"))]));
        let outcome = orch.run(None, "try it").await.unwrap();
        assert_eq!(outcome.response_text, "recovered");

        let results = tool_results(&llm.recorded_requests()[1].messages[2]);
        assert_eq!(results[0].1, "Error executing flaky: skill panicked");
    }

    #[tokio::test]
    async fn test_history_is_append_only_across_messages() {
        let llm = Arc::new(MockLlmService::new());
        let orch = orchestrator(llm.clone(), skills(vec![Arc::new(StaticSkill::new("web_search", "r"))]));

        llm.queue_response(text_response(&["one"]));
        let first = orch.run(None, "first").await.unwrap();
        let id = first.conversation_id.clone();

        let mut previous = orch.conversations().snapshot(&id).await.unwrap();
        for (i, message) in ["second", "third"].iter().enumerate() {
            let call_id = format!("call_{i}");
            llm.queue_response(tool_use_response(&[(
                call_id.as_str(),
                "web_search",
                json!({"query": message}),
            )]));
            llm.queue_response(text_response(&["ok"]));

            let outcome = orch.run(Some(id.clone()), message).await.unwrap();
            assert_eq!(outcome.conversation_id, id);

            let current = orch.conversations().snapshot(&id).await.unwrap();
            assert!(current.len() >= previous.len());
            assert_eq!(&current[..previous.len()], previous.as_slice());
            previous = current;
        }

        // 2 turns for the first exchange, 4 for each tool-using one
        assert_eq!(previous.len(), 10);
        // The model always sees the full history
        assert_eq!(llm.recorded_requests().last().unwrap().messages.len(), 9);
    }

    #[tokio::test]
    async fn test_unknown_conversation_id_starts_fresh() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_response(text_response(&["hello"]));
        let orch = orchestrator(llm.clone(), SkillRegistry::new());

        let outcome = orch.run(Some("made-up".to_string()), "hi").await.unwrap();
        assert_eq!(outcome.conversation_id, "made-up");
        assert_eq!(llm.recorded_requests()[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_message_rejected_before_model_call() {
        let llm = Arc::new(MockLlmService::new());
        let orch = orchestrator(llm.clone(), SkillRegistry::new());

        let err = orch.run(None, "   ").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyMessage));
        assert!(llm.recorded_requests().is_empty());
        assert_eq!(orch.conversations().len().await, 0);
    }

    #[tokio::test]
    async fn test_round_limit_fails_closed() {
        let llm = Arc::new(MockLlmService::new().with_fallback(tool_use_response(&[(
            "loop",
            "web_search",
            json!({"query": "again"}),
        )])));
        let orch = Orchestrator::new(
            llm.clone(),
            Arc::new(skills(vec![Arc::new(StaticSkill::new("web_search", "more"))])),
            ConcurrencyGate::new("provider", 10),
            OrchestratorConfig {
                max_rounds: 3,
                ..Default::default()
            },
        );

        let err = orch
            .run(Some("looping".to_string()), "never stop")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::RoundLimitExceeded(3)));
        assert!(orch.classify(&err).starts_with("INTERNAL_ERROR:"));
        assert_eq!(llm.recorded_requests().len(), 3);

        // Committed history is still well formed: user + 3 x (assistant, results)
        let turns = orch.conversations().snapshot("looping").await.unwrap();
        assert_eq!(turns.len(), 7);
        assert_eq!(turns.last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_provider_error_surfaces_and_releases_permit() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_error(LlmError::timeout("upstream took too long"));
        let orch = orchestrator(llm.clone(), SkillRegistry::new());

        let err = orch.run(Some("c".to_string()), "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
        assert!(orch.classify(&err).starts_with("LLM_PROVIDER_ERROR:"));
        assert_eq!(orch.provider_gate().in_use(), 0);

        let turns = orch.conversations().snapshot("c").await.unwrap();
        assert_eq!(turns, vec![Turn::user_text("hello")]);
    }

    #[tokio::test]
    async fn test_provider_gate_caps_concurrent_model_calls() {
        let llm = Arc::new(SlowLlmService::new(Duration::from_millis(50)));
        let orch = Arc::new(Orchestrator::new(
            llm.clone(),
            Arc::new(SkillRegistry::new()),
            ConcurrencyGate::new("provider", 2),
            OrchestratorConfig::default(),
        ));

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let orch = orch.clone();
                tokio::spawn(async move { orch.run(None, &format!("question {i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(llm.calls(), 5);
        assert_eq!(llm.peak_in_flight(), 2);
        assert_eq!(orch.provider_gate().in_use(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_releases_everything_and_commits_nothing() {
        let llm = Arc::new(SlowLlmService::new(Duration::from_secs(30)));
        let orch = Orchestrator::new(
            llm.clone(),
            Arc::new(SkillRegistry::new()),
            ConcurrencyGate::new("provider", 1),
            OrchestratorConfig::default(),
        );

        let timed_out = tokio::time::timeout(
            Duration::from_millis(50),
            orch.run(Some("c".to_string()), "slow question"),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(orch.provider_gate().in_use(), 0);

        // Lock released, nothing staged was committed
        let turns = tokio::time::timeout(Duration::from_millis(100), orch.conversations().snapshot("c"))
            .await
            .expect("conversation lock should be free");
        assert_eq!(turns, Some(vec![]));
    }

    #[tokio::test]
    async fn test_same_conversation_runs_serialize() {
        let llm = Arc::new(SlowLlmService::new(Duration::from_millis(30)));
        let orch = Arc::new(Orchestrator::new(
            llm.clone(),
            Arc::new(SkillRegistry::new()),
            ConcurrencyGate::new("provider", 10),
            OrchestratorConfig::default(),
        ));

        let a = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.run(Some("shared".to_string()), "a").await })
        };
        let b = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.run(Some("shared".to_string()), "b").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(llm.peak_in_flight(), 1);
        let turns = orch.conversations().snapshot("shared").await.unwrap();
        let roles: Vec<_> = turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_streaming_event_sequence() {
        let llm = Arc::new(MockLlmService::new());
        let mut first = tool_use_response(&[("toolu_1", "web_search", json!({"query": "X"}))]);
        first.content.insert(0, ContentBlock::text("Searching."));
        llm.queue_response(first);
        llm.queue_response(text_response(&["Found it."]));

        let orch = orchestrator(llm, skills(vec![Arc::new(StaticSkill::new("web_search", "X"))]));
        let (tx, mut rx) = mpsc::channel(16);
        let outcome = orch
            .run_streaming(Some("s".to_string()), "search the web for X", &tx)
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let names: Vec<_> = events.iter().map(AgentEvent::name).collect();
        assert_eq!(
            names,
            vec!["conversation", "assistant_text", "tool_call", "tool_result", "done"]
        );
        assert_eq!(
            events.last().unwrap(),
            &AgentEvent::Done {
                conversation_id: "s".to_string(),
                response_text: "Found it.".to_string(),
                usage: outcome.usage,
            }
        );
    }

    #[tokio::test]
    async fn test_streaming_error_is_single_classified_event() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_error(LlmError::context_length("prompt is too long"));
        let orch = orchestrator(llm, SkillRegistry::new());

        let (tx, mut rx) = mpsc::channel(16);
        let result = orch.run_streaming(None, "hi", &tx).await;
        assert!(result.is_err());
        drop(tx);

        let mut terminal = Vec::new();
        while let Some(event) = rx.recv().await {
            if event.is_terminal() {
                terminal.push(event);
            }
        }
        assert_eq!(terminal.len(), 1);
        match &terminal[0] {
            AgentEvent::Error { message } => {
                assert!(message.starts_with("LLM_PROVIDER_ERROR: context length exceeded"));
                assert!(!message.contains('\n'));
            }
            other => panic!("expected error event, got {other:?}"),
        }
    }
}
