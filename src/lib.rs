//! Tutor agent - LLM tool-use orchestration service
//!
//! Runs a model in a loop with a registry of callable skills, shares one
//! provider concurrency budget across all conversations, and sheds load on
//! heavy endpoints instead of queueing it.

pub mod agent;
pub mod api;
pub mod classify;
pub mod config;
pub mod gate;
pub mod llm;
pub mod skills;
pub mod system_prompt;
