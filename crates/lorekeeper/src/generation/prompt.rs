//! Prompt templates for grounded answers and the lore keeper agent

use crate::types::DONT_KNOW_ANSWER;

/// Separator placed between retrieved chunks in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Prompt builder for campaign questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// System instruction for single-shot answers
    pub fn grounding_system_prompt() -> String {
        format!(
            "You are the lore keeper of a Dungeons & Dragons campaign. \
             Answer ONLY with information found in the context you are given. \
             If the answer is not explicitly stated there, reply with '{}' \
             Do not use outside knowledge, do not guess and do not invent details. \
             Base every statement strictly on the context.",
            DONT_KNOW_ANSWER
        )
    }

    /// Join retrieved chunks into one context block, best match first
    pub fn build_context(contexts: &[String]) -> String {
        contexts.join(CONTEXT_SEPARATOR)
    }

    /// User prompt carrying the context block and the question
    pub fn build_user_prompt(question: &str, context: &str) -> String {
        format!(
            "Context:\n{context}\n\n\
             Question: {question}\n\n\
             Remember: if the answer is not in the context, say '{fallback}'\n\n\
             Answer in a concise, clear way, referring to PCs, NPCs, locations, \
             and events by name when relevant.",
            context = context,
            question = question,
            fallback = DONT_KNOW_ANSWER,
        )
    }

    /// System instruction for the tool-calling agent
    ///
    /// The search policy here is advice to the model; the loop itself only
    /// enforces the turn cap.
    pub fn agent_system_prompt() -> String {
        format!(
            "You are the lore keeper of a Dungeons & Dragons campaign. \
             Answer ONLY with information from the context you already have or \
             that you gather through tool calls. \
             If the answer is not explicitly supported, reply with '{}' \
             Do not use outside knowledge, do not guess and do not invent details.\n\n\
             You may call tools several times. After each result, decide whether \
             another search with a different query would improve the answer. \
             For non-trivial questions, usually run two or three searches before \
             answering unless the first result is clearly sufficient. \
             Stop once you are confident the answer is complete and accurate, or \
             say you don't know.\n\n\
             To use a tool, respond with a tool call. Never describe a tool call \
             in plain text or JSON.",
            DONT_KNOW_ANSWER
        )
    }
}
