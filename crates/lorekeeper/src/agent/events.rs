//! Progress events emitted while the agent works

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::types::ToolCall;

/// Observable step of an agent exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A model turn is starting (1-based)
    TurnStarted { turn: usize },
    /// Partial text from the model
    TextDelta { text: String },
    /// The model requested a tool call
    ToolCallStarted { call: ToolCall },
    /// A tool call finished
    ToolCallResult {
        call_id: String,
        name: String,
        content: String,
        is_error: bool,
    },
    /// The exchange completed with an answer
    FinalResult { answer: String },
    /// The turn cap was hit before the model stopped calling tools
    TurnLimitReached {
        turns: usize,
        partial: Option<String>,
    },
}

impl AgentEvent {
    /// Event name used on streaming transports
    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnStarted { .. } => "turn_started",
            Self::TextDelta { .. } => "text_delta",
            Self::ToolCallStarted { .. } => "tool_call_started",
            Self::ToolCallResult { .. } => "tool_call_result",
            Self::FinalResult { .. } => "final_result",
            Self::TurnLimitReached { .. } => "turn_limit_reached",
        }
    }
}

/// Receiver of agent events
///
/// Sinks observe only; nothing they do feeds back into the loop.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

impl<F> EventSink for F
where
    F: Fn(AgentEvent) + Send + Sync,
{
    fn emit(&self, event: AgentEvent) {
        self(event)
    }
}

/// Forwards events to a channel; a closed receiver is ignored
impl EventSink for UnboundedSender<AgentEvent> {
    fn emit(&self, event: AgentEvent) {
        let _ = self.send(event);
    }
}

/// Discards every event
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: AgentEvent) {}
}
