//! Core types for the lorekeeper pipeline

pub mod document;
pub mod message;
pub mod query;
pub mod response;

pub use document::{
    Character, Chunk, Document, DocumentKind, IndexPoint, Page, CONTENT_KEY, GM_ONLY_KEY,
    TAGS_KEY, TITLE_KEY, TYPE_KEY,
};
pub use message::{ChatDelta, ChatRequest, ChatResponse, History, Message, ToolCall, ToolDefinition};
pub use query::{AgentRequest, AskRequest, ToolCallRequest};
pub use response::{
    AgentResponse, Answer, DocumentFailure, IngestReport, DONT_KNOW_ANSWER, NOTHING_FOUND_ANSWER,
};
