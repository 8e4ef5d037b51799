//! Key-value memory skill backed by a JSON file
//!
//! The store is process-wide, not per conversation. All access goes through
//! one async mutex, which also serializes writes to the backing file.

use super::{Skill, SkillError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;

const MAX_VALUE_LEN: usize = 8 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryEntry {
    value: String,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    loaded: bool,
    entries: BTreeMap<String, MemoryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum MemoryInput {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    List,
}

pub struct MemorySkill {
    path: PathBuf,
    store: Mutex<Store>,
}

impl MemorySkill {
    /// Open a store at `path`. The file is read lazily on first use and
    /// created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            store: Mutex::new(Store::default()),
        }
    }

    async fn load(&self, store: &mut Store) -> Result<(), SkillError> {
        if store.loaded {
            return Ok(());
        }
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                store.entries = serde_json::from_slice(&bytes).map_err(|e| {
                    SkillError::Failed(format!(
                        "memory store {} is corrupt: {e}",
                        self.path.display()
                    ))
                })?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        store.loaded = true;
        Ok(())
    }

    async fn persist(&self, entries: &BTreeMap<String, MemoryEntry>) -> Result<(), SkillError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| SkillError::Failed(format!("failed to encode memory store: {e}")))?;

        // Write-then-rename so a crash never leaves a half-written store
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Skill for MemorySkill {
    fn name(&self) -> &str {
        "memory_store"
    }

    fn description(&self) -> String {
        "Long-term key-value memory shared across conversations. Use `set` to remember a fact under a short key, `get` to recall it, `delete` to forget it, and `list` to see what is stored.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["action"],
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["set", "get", "delete", "list"]
                },
                "key": {
                    "type": "string",
                    "description": "Memory key (required for set, get, delete)"
                },
                "value": {
                    "type": "string",
                    "description": "Value to store (required for set)"
                }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<String, SkillError> {
        let input: MemoryInput = serde_json::from_value(input).map_err(SkillError::invalid_input)?;

        let mut store = self.store.lock().await;
        self.load(&mut store).await?;

        match input {
            MemoryInput::Set { key, value } => {
                if key.trim().is_empty() {
                    return Err(SkillError::invalid_input("key must not be empty"));
                }
                if value.len() > MAX_VALUE_LEN {
                    return Err(SkillError::invalid_input(format!(
                        "value exceeds {MAX_VALUE_LEN} bytes"
                    )));
                }
                // Only swap in the new map once it is on disk
                let mut updated = store.entries.clone();
                updated.insert(
                    key.clone(),
                    MemoryEntry {
                        value,
                        updated_at: Utc::now(),
                    },
                );
                self.persist(&updated).await?;
                store.entries = updated;
                Ok(format!("Stored '{key}'"))
            }
            MemoryInput::Get { key } => Ok(match store.entries.get(&key) {
                Some(entry) => entry.value.clone(),
                None => format!("No memory stored under '{key}'"),
            }),
            MemoryInput::Delete { key } => {
                let mut updated = store.entries.clone();
                if updated.remove(&key).is_some() {
                    self.persist(&updated).await?;
                    store.entries = updated;
                    Ok(format!("Deleted '{key}'"))
                } else {
                    Ok(format!("No memory stored under '{key}'"))
                }
            }
            MemoryInput::List => {
                if store.entries.is_empty() {
                    return Ok("Memory is empty".to_string());
                }
                let mut out = String::new();
                for (key, entry) in &store.entries {
                    let _ = writeln!(out, "- {key} (updated {})", entry.updated_at.to_rfc3339());
                }
                Ok(out)
            }
        }
    }
}
