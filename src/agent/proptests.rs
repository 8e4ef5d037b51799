//! Property-based tests for conversation history
//!
//! Random scripts of tool-requesting rounds, run across several user
//! messages. After every message the committed history must:
//! - extend the previous history without changing it
//! - answer every `tool_use` exactly once, in the very next turn, in order

use super::testing::{text_response, tool_use_response, MockLlmService, StaticSkill};
use super::{Orchestrator, OrchestratorConfig};
use crate::gate::ConcurrencyGate;
use crate::llm::{ContentBlock, Role, Turn};
use crate::skills::SkillRegistry;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// Tool names the model may request; `missing` is never registered
const NAMES: &[&str] = &["web_search", "memory_store", "missing"];

/// One message's script: tool calls per round before the final answer
fn arb_message() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0..NAMES.len(), 1..4), 0..4)
}

fn check_pairing(turns: &[Turn]) -> Result<(), TestCaseError> {
    for (i, turn) in turns.iter().enumerate() {
        let requested: Vec<&str> = turn.tool_uses().map(|c| c.id).collect();
        if requested.is_empty() {
            continue;
        }
        prop_assert_eq!(turn.role, Role::Assistant);
        let next = turns.get(i + 1);
        prop_assert!(next.is_some(), "tool_use at end of history");
        let answered: Vec<&str> = next
            .into_iter()
            .flat_map(|t| t.content.iter())
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(requested, answered);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn history_is_append_only_and_well_paired(
        script in prop::collection::vec(arb_message(), 1..4)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let llm = Arc::new(MockLlmService::new());
            let mut skills = SkillRegistry::new();
            skills.register(Arc::new(StaticSkill::new("web_search", "hits"))).unwrap();
            skills.register(Arc::new(StaticSkill::new("memory_store", "stored"))).unwrap();
            let orch = Orchestrator::new(
                llm.clone(),
                Arc::new(skills),
                ConcurrencyGate::new("provider", 4),
                OrchestratorConfig::default(),
            );

            let mut previous: Vec<Turn> = Vec::new();
            let mut next_id = 0usize;
            for (m, rounds) in script.iter().enumerate() {
                for round in rounds {
                    let ids: Vec<String> = round
                        .iter()
                        .map(|_| {
                            next_id += 1;
                            format!("call_{next_id}")
                        })
                        .collect();
                    let calls: Vec<_> = round
                        .iter()
                        .zip(&ids)
                        .map(|(&n, id)| (id.as_str(), NAMES[n], json!({})))
                        .collect();
                    llm.queue_response(tool_use_response(&calls));
                }
                llm.queue_response(text_response(&["answer"]));

                let outcome = orch
                    .run(Some("prop".to_string()), &format!("message {m}"))
                    .await
                    .unwrap();
                prop_assert_eq!(outcome.response_text, "answer");

                let current = orch.conversations().snapshot("prop").await.unwrap();
                prop_assert_eq!(current.len(), previous.len() + 2 + 2 * rounds.len());
                prop_assert_eq!(&current[..previous.len()], previous.as_slice());
                check_pairing(&current)?;
                previous = current;
            }
            Ok(())
        })?;
    }
}
