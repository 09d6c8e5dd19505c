//! LLM provider trait for single-shot generation and tool-calling chat

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{ChatDelta, ChatRequest};

/// Stream of incremental pieces of one model turn
pub type ChatStream = BoxStream<'static, Result<ChatDelta>>;

/// Trait for language-model backends
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (`/api/generate`, `/api/chat`)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Single-shot completion with a system instruction and one user prompt
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;

    /// One chat turn, delivered incrementally
    ///
    /// The stream ends when the turn is complete. Tool calls arrive whole.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
