//! In-memory fakes for the provider traits, compiled only for tests

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::providers::{ChatStream, ContentSource, EmbeddingProvider, LlmProvider};
use crate::types::{
    ChatDelta, ChatRequest, ChatResponse, Character, Document, DocumentKind, Page, ToolCall,
};

/// Build a wiki page document
pub fn page(id: &str, title: &str, body: &str, gm_only: bool) -> Document {
    Document::Page(wiki_page(id, title, body, gm_only))
}

pub fn wiki_page(id: &str, title: &str, body: &str, gm_only: bool) -> Page {
    Page {
        id: id.to_string(),
        kind: DocumentKind::WikiPage,
        title: title.to_string(),
        body: body.to_string(),
        source_url: format!("https://example.test/wikis/{}", id),
        tags: Vec::new(),
        gm_only,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn character(id: &str, name: &str, description: &str, bio: &str, gm_only: bool) -> Character {
    Character {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        bio: bio.to_string(),
        is_player_character: false,
        source_url: format!("https://example.test/characters/{}", id),
        tags: Vec::new(),
        gm_only,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

/// Bag-of-words embedder: texts sharing words point in similar directions
#[derive(Default)]
pub struct HashingEmbedder {
    calls: Mutex<usize>,
}

impl HashingEmbedder {
    pub const DIMENSIONS: usize = 64;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; Self::DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % Self::DIMENSIONS as u64) as usize] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        *self.calls.lock() += 1;
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

/// Embedder whose every call fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::embedding("embedding service unavailable"))
    }

    fn dimensions(&self) -> usize {
        HashingEmbedder::DIMENSIONS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// LLM that replays scripted turns and records what it was asked
#[derive(Default)]
pub struct ScriptedLlm {
    turns: Mutex<VecDeque<ChatResponse>>,
    repeat: Option<ChatResponse>,
    reply: String,
    chat_requests: Mutex<Vec<ChatRequest>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedLlm {
    /// Replays `turns` in order, then fails
    pub fn new(turns: Vec<ChatResponse>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            ..Self::default()
        }
    }

    /// Answers every chat turn with the same response
    pub fn always(turn: ChatResponse) -> Self {
        Self {
            repeat: Some(turn),
            ..Self::default()
        }
    }

    /// Single-shot generation reply
    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = reply.to_string();
        self
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().clone()
    }

    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().clone()
    }

    fn next_turn(&self) -> Result<ChatResponse> {
        self.turns
            .lock()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| Error::model("script exhausted"))
    }
}

/// A model turn that only calls tools
pub fn tool_turn(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        content: String::new(),
        tool_calls: calls,
    }
}

/// A model turn that only answers
pub fn text_turn(text: &str) -> ChatResponse {
    ChatResponse {
        content: text.to_string(),
        tool_calls: Vec::new(),
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .push((system.to_string(), prompt.to_string()));
        Ok(self.reply.trim().to_string())
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        self.chat_requests.lock().push(request.clone());
        let turn = self.next_turn()?;

        // Split text in two so consumers see more than one delta
        let mut deltas = Vec::new();
        if !turn.content.is_empty() {
            let mid = turn
                .content
                .char_indices()
                .nth(turn.content.chars().count() / 2)
                .map(|(i, _)| i)
                .unwrap_or(0);
            let (head, tail) = turn.content.split_at(mid);
            deltas.extend(
                [head, tail]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| Ok(ChatDelta::Text(s.to_string()))),
            );
        }
        deltas.extend(turn.tool_calls.into_iter().map(|c| Ok(ChatDelta::ToolCall(c))));

        Ok(stream::iter(deltas).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Content source whose every request fails in transport
pub struct UnreachableSource;

#[async_trait]
impl ContentSource for UnreachableSource {
    async fn list_wiki_pages(&self) -> Result<Vec<Page>> {
        Err(Error::transport("unreachable", "connection refused"))
    }

    async fn get_wiki_page(&self, _page_id: &str) -> Result<Page> {
        Err(Error::transport("unreachable", "connection refused"))
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        Err(Error::transport("unreachable", "connection refused"))
    }

    async fn get_character(&self, _character_id: &str) -> Result<Character> {
        Err(Error::transport("unreachable", "connection refused"))
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

/// Content source serving fixed pages and characters
#[derive(Default)]
pub struct StaticContentSource {
    pub pages: Vec<Page>,
    pub characters: Vec<Character>,
    /// Character ids whose detail fetch fails
    pub broken_characters: Vec<String>,
}

#[async_trait]
impl ContentSource for StaticContentSource {
    async fn list_wiki_pages(&self) -> Result<Vec<Page>> {
        Ok(self.pages.clone())
    }

    async fn get_wiki_page(&self, page_id: &str) -> Result<Page> {
        self.pages
            .iter()
            .find(|p| p.id == page_id)
            .cloned()
            .ok_or_else(|| Error::transport("static", format!("no page {}", page_id)))
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        Ok(self
            .characters
            .iter()
            .map(|c| Character {
                description: String::new(),
                bio: String::new(),
                ..c.clone()
            })
            .collect())
    }

    async fn get_character(&self, character_id: &str) -> Result<Character> {
        if self.broken_characters.iter().any(|id| id == character_id) {
            return Err(Error::transport("static", "connection reset"));
        }
        self.characters
            .iter()
            .find(|c| c.id == character_id)
            .cloned()
            .ok_or_else(|| Error::transport("static", format!("no character {}", character_id)))
    }

    fn name(&self) -> &str {
        "static"
    }
}
