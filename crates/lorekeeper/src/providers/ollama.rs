//! Ollama-based providers for embeddings and LLM
//!
//! Both providers share one `OllamaClient`. Embeddings go through
//! `/api/embed`, single-shot answers through `/api/generate` and the
//! tool-calling agent through streamed `/api/chat`.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::types::{ChatDelta, ChatRequest, Message, ToolCall, ToolDefinition};

use super::embedding::EmbeddingProvider;
use super::llm::{ChatStream, LlmProvider};

const SERVICE: &str = "ollama";

/// Thin HTTP client for an Ollama server
pub struct OllamaClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChatWireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

fn plain(role: &'static str, content: &str) -> WireMessage {
    WireMessage {
        role,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_name: None,
        tool_call_id: None,
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        match message {
            Message::System { content } => plain("system", content),
            Message::User { content } => plain("user", content),
            Message::Assistant {
                content,
                tool_calls,
            } => WireMessage {
                tool_calls: tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: Some(call.id.clone()),
                        function: WireFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
                ..plain("assistant", content)
            },
            Message::Tool {
                tool_call_id,
                name,
                content,
            } => WireMessage {
                tool_name: Some(name.clone()),
                tool_call_id: Some(tool_call_id.clone()),
                ..plain("tool", content)
            },
        }
    }
}

impl OllamaClient {
    /// Create a new client; `timeout_secs` bounds every request
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    /// Create a client from LLM configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout_secs)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout("ollama request", self.timeout_secs)
        } else {
            Error::transport(SERVICE, e.to_string())
        }
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::model(format!("HTTP {} - {}", status, body)));
        }
        Ok(response)
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Embed several texts in one request
    pub async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .post("/api/embed", &EmbedRequest { model, input: texts })
            .await
            .map_err(|e| match e {
                Error::Model(message) => Error::embedding(message),
                other => other,
            })?;

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }

    /// Single non-streamed completion
    pub async fn generate(&self, model: &str, prompt: String, temperature: f32) -> Result<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };

        let parsed: GenerateResponse = self
            .post("/api/generate", &request)
            .await?
            .json()
            .await
            .map_err(|e| Error::model(format!("Failed to parse generation response: {}", e)))?;

        Ok(parsed.response.trim().to_string())
    }

    /// Streamed chat turn with optional tools
    pub async fn chat_stream(
        &self,
        model: &str,
        request: &ChatRequest,
        default_temperature: f32,
    ) -> Result<ChatStream> {
        let body = ChatWireRequest {
            model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request
                .tools
                .iter()
                .map(|function| WireTool {
                    kind: "function",
                    function,
                })
                .collect(),
            stream: true,
            options: GenerateOptions {
                temperature: request.temperature.unwrap_or(default_temperature),
            },
        };

        let response = self.post("/api/chat", &body).await?;
        Ok(ndjson_deltas(response.bytes_stream()))
    }
}

struct NdjsonState<S> {
    bytes: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<ChatDelta>>,
    finished: bool,
}

impl<S> NdjsonState<S> {
    fn push_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() || self.finished {
            return;
        }

        let chunk: ChatChunk = match serde_json::from_str(line) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.fail(Error::model(format!("Malformed chat stream line: {}", e)));
                return;
            }
        };

        if let Some(message) = chunk.error {
            self.fail(Error::model(message));
            return;
        }

        let message = chunk.message.unwrap_or_default();
        if !message.content.is_empty() {
            self.pending.push_back(Ok(ChatDelta::Text(message.content)));
        }
        for call in message.tool_calls {
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
            self.pending.push_back(Ok(ChatDelta::ToolCall(ToolCall::new(
                id,
                call.function.name,
                call.function.arguments,
            ))));
        }

        if chunk.done {
            self.finished = true;
        }
    }

    fn fail(&mut self, error: Error) {
        self.pending.push_back(Err(error));
        self.finished = true;
    }
}

/// Turn an NDJSON byte stream from `/api/chat` into chat deltas
fn ndjson_deltas<S, B>(bytes: S) -> ChatStream
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = NdjsonState {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(chunk.as_ref());
                    while let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                        state.push_line(&line);
                    }
                }
                Some(Err(e)) => state.fail(Error::transport(SERVICE, e.to_string())),
                None => {
                    let rest = std::mem::take(&mut state.buffer);
                    state.push_line(&rest);
                    if !state.finished {
                        state.fail(Error::transport(
                            SERVICE,
                            "chat stream ended before the final message",
                        ));
                    }
                }
            }
        }
    })
    .boxed()
}

/// Ollama embedding provider (all-minilm by default)
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    /// Create from an existing client
    pub fn from_client(client: Arc<OllamaClient>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            dimensions: config.dimensions,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.client.embed(&self.model, batch).await?);
        }

        if let Some(bad) = embeddings.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::embedding(format!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                bad.len(),
                self.dimensions
            )));
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answers and agent turns
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
    temperature: f32,
}

impl OllamaLlm {
    /// Create from an existing client
    pub fn from_client(client: Arc<OllamaClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.generate_model.clone(),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        tracing::info!("Generating answer with model: {}", self.model);
        let prompt = format!("System: {}\n\nUser: {}\n", system, prompt);
        self.client.generate(&self.model, prompt, self.temperature).await
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Starting chat turn"
        );
        self.client
            .chat_stream(&self.model, request, self.temperature)
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
