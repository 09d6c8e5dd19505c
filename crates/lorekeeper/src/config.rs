//! Configuration for the lorekeeper pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoreConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Vector index configuration
    pub vector_db: VectorDbConfig,
    /// Retrieval defaults
    pub retrieval: RetrievalConfig,
    /// Tool-calling agent configuration
    pub agent: AgentConfig,
    /// Campaign content source configuration
    pub portal: PortalConfig,
    /// Ingestion run configuration
    pub ingestion: IngestionConfig,
}

impl LoreConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    /// Load from `path` when given, otherwise defaults; environment overrides apply either way
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Apply `LOREKEEPER_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("LOREKEEPER_OLLAMA_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("LOREKEEPER_OLLAMA_MODEL") {
            self.llm.generate_model = v;
        }
        if let Some(v) = lookup("LOREKEEPER_QDRANT_URL") {
            self.vector_db.url = v;
        }
        if let Some(v) = lookup("LOREKEEPER_QDRANT_API_KEY") {
            self.vector_db.api_key = Some(v);
        }
        if let Some(v) = lookup("LOREKEEPER_COLLECTION") {
            self.vector_db.collection = v;
        }
        if let Some(v) = lookup("LOREKEEPER_CAMPAIGN_ID") {
            self.portal.campaign_id = Some(v);
        }
        if let Some(v) = lookup("LOREKEEPER_PORTAL_AUTHORIZATION") {
            self.portal.authorization = Some(v);
        }
        if let Some(v) = lookup("LOREKEEPER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = v;
        }
    }

    /// Reject inconsistent settings
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".into()));
        }
        if self.chunking.max_chars == 0 {
            return Err(Error::Config("chunking.max_chars must be positive".into()));
        }
        if self.chunking.overlap_chars >= self.chunking.max_chars {
            return Err(Error::Config(format!(
                "chunking.overlap_chars ({}) must be smaller than chunking.max_chars ({})",
                self.chunking.overlap_chars, self.chunking.max_chars
            )));
        }
        if self.agent.max_turns == 0 {
            return Err(Error::Config("agent.max_turns must be at least 1".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".into()));
        }
        if self.vector_db.collection.trim().is_empty() {
            return Err(Error::Config("vector_db.collection must not be empty".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama `/api/embed`
    #[default]
    Ollama,
    /// Local ONNX Runtime session
    Onnx,
}

/// Embedding configuration
///
/// Ingestion and querying must use the same model and dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend provider
    pub backend: EmbeddingBackend,
    /// Ollama embedding model tag
    pub model: String,
    /// HuggingFace repository holding the ONNX export
    pub onnx_repo: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Cache directory for ONNX models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            model: "all-minilm".to_string(),
            onnx_repo: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lorekeeper")
                .join("models"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Character budget per chunk
    pub max_chars: usize,
    /// Characters carried over from the previous chunk
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 800,
            overlap_chars: 150,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.1:8b-instruct-q4_K_M".to_string(),
            temperature: 0.2,
            timeout_secs: 300,
        }
    }
}

/// Vector index backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Qdrant over REST
    #[default]
    Qdrant,
    /// Process-local index (lost on exit)
    Memory,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Backend provider
    pub backend: VectorBackend,
    /// Qdrant base URL
    pub url: String,
    /// Optional Qdrant API key
    pub api_key: Option<String>,
    /// Collection name
    pub collection: String,
    /// Named vector inside the collection (None for the unnamed default vector)
    pub vector_name: Option<String>,
    /// HNSW `ef` used at query time
    pub hnsw_ef: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Qdrant,
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "campaign-notes".to_string(),
            vector_name: Some("fast-all-minilm-l6-v2".to_string()),
            hnsw_ef: 128,
            timeout_secs: 30,
        }
    }
}

/// Retrieval defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved per query
    pub top_k: usize,
    /// Whether GM-only content is searched by default
    pub include_gm_only: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            include_gm_only: false,
        }
    }
}

/// Tool-calling agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Hard cap on model turns per exchange
    pub max_turns: usize,
    /// Bound on one model turn, in seconds
    pub turn_timeout_secs: u64,
    /// Bound on one tool dispatch, in seconds
    pub tool_timeout_secs: u64,
    /// Temperature for agent turns
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            turn_timeout_secs: 300,
            tool_timeout_secs: 60,
            temperature: 0.2,
        }
    }
}

/// Campaign content source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// API base URL
    pub base_url: String,
    /// Campaign to ingest
    pub campaign_id: Option<String>,
    /// Pre-computed `Authorization` header value for the portal API
    pub authorization: Option<String>,
    /// User agent sent with every request
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.obsidianportal.com/v1".to_string(),
            campaign_id: None,
            authorization: None,
            user_agent: format!("lorekeeper/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 60,
        }
    }
}

/// Ingestion run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Documents prepared and upserted concurrently
    pub parallel_documents: usize,
    /// Character fetches issued concurrently
    pub parallel_fetches: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            parallel_documents: num_cpus::get().clamp(1, 4),
            parallel_fetches: 4,
        }
    }
}
