//! Provider abstractions for embeddings, LLM, vector storage and campaign content
//!
//! This module provides trait-based abstractions that allow switching between
//! backends (Ollama or in-process ONNX embeddings, Qdrant or in-memory index).

pub mod content_source;
pub mod embedding;
pub mod llm;
pub mod memory;
pub mod obsidian_portal;
pub mod ollama;
pub mod onnx;
pub mod qdrant;
pub mod vector_store;

pub use content_source::{check_record_id, ContentSource};
pub use embedding::EmbeddingProvider;
pub use llm::{ChatStream, LlmProvider};
pub use memory::MemoryVectorStore;
pub use obsidian_portal::{ObsidianPortalClient, PortalSession, RequestSigner, StaticAuthorization};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use onnx::OnnxEmbedder;
pub use qdrant::QdrantStore;
pub use vector_store::{Condition, MetadataFilter, ScoredPoint, VectorStoreProvider};
