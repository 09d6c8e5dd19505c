//! Response types for answers and ingestion runs

use serde::{Deserialize, Serialize};

use super::message::History;

/// Fixed reply when retrieval finds nothing; no model is consulted
pub const NOTHING_FOUND_ANSWER: &str = "I couldn't find anything relevant in the campaign notes.";

/// Phrase the model must use when the context does not contain the answer
pub const DONT_KNOW_ANSWER: &str = "I don't know based on the provided information.";

/// Grounded answer with the titles of the documents it was drawn from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Model answer (trimmed) or the fixed not-found reply
    pub answer: String,
    /// Distinct titles of the retrieved chunks, sorted
    pub sources: Vec<String>,
    /// Number of chunks used as context
    pub chunks_retrieved: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl Answer {
    /// Answer for an empty retrieval
    pub fn not_found(processing_time_ms: u64) -> Self {
        Self {
            answer: NOTHING_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
            chunks_retrieved: 0,
            processing_time_ms,
        }
    }
}

/// Result of one agent exchange as returned over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// `completed` or `turn_limit_reached`
    pub status: String,
    /// Final answer, or the last partial text when the turn cap was hit
    pub answer: Option<String>,
    /// Model turns used
    pub turns: usize,
    /// Tool calls executed
    pub tool_calls: usize,
    /// Full history to carry into the next exchange
    pub history: History,
}

/// A document that could not be ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub document_id: String,
    pub title: String,
    pub error: String,
}

/// Summary of an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents fetched from the content source
    pub documents_seen: usize,
    /// Documents whose points were written
    pub documents_indexed: usize,
    /// Documents with empty content
    pub documents_empty: usize,
    /// Points written to the index
    pub points_written: usize,
    /// Documents that failed; the rest of the run continued
    pub failures: Vec<DocumentFailure>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
