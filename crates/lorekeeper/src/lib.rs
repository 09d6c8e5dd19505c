//! lorekeeper: campaign lore Q&A grounded in Obsidian Portal notes
//!
//! Wiki pages, adventure log posts and characters are fetched from a campaign,
//! chunked, embedded and stored in a vector index. Questions are answered
//! either in a single shot from the retrieved chunks, or by a tool-calling
//! agent that searches the notes as often as it needs to. Game-master-only
//! notes are only ever searched when the caller asks for them.

pub mod agent;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use agent::{AgentEvent, AgentOutcome, AgentRunner, AgentStatus, EventSink, ToolRegistry};
pub use config::LoreConfig;
pub use error::{Error, Result};
pub use generation::AnswerSynthesizer;
pub use ingestion::{chunk_text, IngestPipeline};
pub use retrieval::{RetrievalResult, Retriever};
pub use types::{Answer, Document, History, IngestReport, Message};
