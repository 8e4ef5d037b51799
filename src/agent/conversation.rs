//! In-process conversation store
//!
//! Each conversation sits behind its own async mutex. An orchestration run
//! checks the conversation out for its whole duration, so two requests for
//! the same id run one after the other instead of interleaving writes.

use crate::llm::Turn;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Append-only history for one conversation
#[derive(Debug)]
pub struct Conversation {
    id: String,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
}

impl Conversation {
    fn new(id: String) -> Self {
        Self {
            id,
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append turns at the end. There is no way to edit or remove a turn.
    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
    }
}

/// Exclusive handle on a conversation for the length of one run
pub type ConversationGuard = OwnedMutexGuard<Conversation>;

#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Arc<Mutex<Conversation>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the conversation with `id`, creating it when absent.
    ///
    /// No id mints a fresh UUID. An unknown id starts an empty history
    /// under that id.
    pub async fn checkout(&self, id: Option<String>) -> ConversationGuard {
        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let existing = self.conversations.read().await.get(&id).cloned();
        let entry = match existing {
            Some(entry) => entry,
            None => {
                let mut map = self.conversations.write().await;
                map.entry(id.clone())
                    .or_insert_with(|| {
                        tracing::debug!(conv_id = %id, "Creating conversation");
                        Arc::new(Mutex::new(Conversation::new(id.clone())))
                    })
                    .clone()
            }
        };

        entry.lock_owned().await
    }

    /// Copy of the committed turns, or `None` for an unknown id.
    ///
    /// Waits for an in-flight run on the same conversation to finish.
    pub async fn snapshot(&self, id: &str) -> Option<Vec<Turn>> {
        let entry = self.conversations.read().await.get(id).cloned()?;
        let conversation = entry.lock().await;
        Some(conversation.turns().to_vec())
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.conversations.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }
}
