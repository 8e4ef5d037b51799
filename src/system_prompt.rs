//! Fixed system instructions sent with every model call

use crate::skills::SkillRegistry;
use std::fmt::Write;

/// Base system prompt establishing the assistant's role
const BASE_PROMPT: &str = r"You are a patient, knowledgeable study assistant. Answer the learner's questions clearly and accurately, and check your facts with tools when you are not certain.

Be concise. When you use a tool, say briefly what you are looking up. If a tool returns an error, explain what went wrong and either try another approach or answer with what you know.";

/// Build the system prompt, including a short catalog of the registered skills
pub fn build_system_prompt(skills: &SkillRegistry) -> String {
    let mut prompt = BASE_PROMPT.to_string();

    if !skills.is_empty() {
        prompt.push_str("\n\nAvailable skills:\n");
        for skill in skills.list() {
            let _ = writeln!(prompt, "- {}: {}", skill.name, skill.description);
        }
    }

    prompt
}
