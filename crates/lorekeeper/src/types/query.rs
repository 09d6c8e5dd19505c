//! Request types for the question-answering surfaces

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::History;

/// Single-shot question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve (default: `retrieval.top_k`)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Also search GM-only content (default: false)
    #[serde(default)]
    pub include_gm_only: bool,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
            include_gm_only: false,
        }
    }
}

/// One exchange with the tool-calling agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    /// The new user question
    pub question: String,

    /// History carried forward from earlier exchanges
    #[serde(default)]
    pub history: History,

    /// Grant the exchange access to GM-only content (default: false)
    #[serde(default)]
    pub include_gm_only: bool,
}

/// Direct invocation of a registered tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Registered tool name
    pub name: String,

    /// Arguments object
    #[serde(default = "empty_object")]
    pub arguments: Value,

    /// Grant the call access to GM-only content (default: false)
    #[serde(default)]
    pub include_gm_only: bool,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}
