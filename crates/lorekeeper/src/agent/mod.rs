//! Tool-calling lore keeper agent
//!
//! The model is given the campaign tools and called in a loop: each turn
//! either requests tools, whose results are fed back, or answers. A hard turn
//! cap guarantees termination.

pub mod events;
pub mod runner;
pub mod tools;

pub use events::{AgentEvent, EventSink, NullSink};
pub use runner::{AgentOutcome, AgentRunner, AgentStatus};
pub use tools::{
    SearchTool, Tool, ToolContext, ToolOutput, ToolRegistry, NO_MATCHES, SEARCH_TOOL,
};
