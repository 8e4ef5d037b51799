//! Capability registry
//!
//! Skills are registered once at startup and shared read-only afterwards.
//! The orchestrator reaches every skill through the [`Skill`] trait and
//! [`SkillRegistry::dispatch`]; adding a skill never touches the agent loop.

mod memory;
mod web_search;

pub use memory::MemorySkill;
pub use web_search::WebSearchSkill;

use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by a skill while executing
#[derive(Debug, Error)]
pub enum SkillError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Failed(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SkillError {
    pub fn invalid_input(e: impl std::fmt::Display) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

/// Why a dispatch produced no output
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tool '{0}'")]
    UnknownSkill(String),
    #[error("{name}: {source}")]
    Failed {
        name: String,
        #[source]
        source: SkillError,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("skill '{0}' is already registered")]
    Duplicate(String),
    #[error("skill names must be non-empty")]
    EmptyName,
}

/// Contract every invocable capability implements.
///
/// Implementations are shared across conversations and may be called
/// concurrently; any private mutable state needs its own synchronization.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Stable name the model uses to request this skill
    fn name(&self) -> &str;

    /// Description for the model
    fn description(&self) -> String;

    /// JSON schema for the input object
    fn input_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<String, SkillError>;
}

/// Name and description pair, as listed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
}

/// Registry of skills keyed by name, in registration order
#[derive(Default)]
pub struct SkillRegistry {
    skills: Vec<Arc<dyn Skill>>,
    by_name: HashMap<String, usize>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard skill set for the service
    pub fn standard(search_endpoint: Option<String>, memory: MemorySkill) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(Arc::new(WebSearchSkill::new(search_endpoint)))?;
        registry.register(Arc::new(memory))?;
        Ok(registry)
    }

    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Result<(), RegistryError> {
        let name = skill.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tracing::debug!(skill = %name, "Registered skill");
        self.by_name.insert(name, self.skills.len());
        self.skills.push(skill);
        Ok(())
    }

    pub fn list(&self) -> Vec<SkillSummary> {
        self.skills
            .iter()
            .map(|s| SkillSummary {
                name: s.name().to_string(),
                description: s.description(),
            })
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(|s| s.name())
    }

    /// Tool declarations advertised to the model
    pub fn declarations(&self) -> Vec<ToolDefinition> {
        self.skills
            .iter()
            .map(|s| ToolDefinition {
                name: s.name().to_string(),
                description: s.description(),
                input_schema: s.input_schema(),
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Skill>> {
        self.by_name.get(name).map(|&i| &self.skills[i])
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Execute a skill by name
    pub async fn dispatch(&self, name: &str, input: Value) -> Result<String, DispatchError> {
        let skill = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownSkill(name.to_string()))?;

        skill
            .execute(input)
            .await
            .map_err(|source| DispatchError::Failed {
                name: name.to_string(),
                source,
            })
    }
}
