//! Application state shared by the HTTP handlers and the CLI

use parking_lot::RwLock;
use std::sync::Arc;

use crate::agent::{AgentRunner, ToolRegistry};
use crate::config::{EmbeddingBackend, LoreConfig, VectorBackend};
use crate::error::{Error, Result};
use crate::generation::AnswerSynthesizer;
use crate::ingestion::{Indexer, IngestPipeline, TextChunker};
use crate::providers::{
    ContentSource, EmbeddingProvider, LlmProvider, MemoryVectorStore, ObsidianPortalClient,
    OllamaClient, OllamaEmbedder, OllamaLlm, OnnxEmbedder, QdrantStore, VectorStoreProvider,
};
use crate::retrieval::Retriever;
use crate::types::IngestReport;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: LoreConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStoreProvider>,
    /// Present when a campaign is configured
    source: Option<Arc<dyn ContentSource>>,
    indexer: Arc<Indexer>,
    retriever: Arc<Retriever>,
    synthesizer: AnswerSynthesizer,
    tools: Arc<ToolRegistry>,
    agent: AgentRunner,
    /// Held for the duration of an ingestion run
    ingest_lock: tokio::sync::Mutex<()>,
    ready: RwLock<bool>,
}

impl AppState {
    /// Build every provider from configuration and prepare the collection
    pub async fn new(config: LoreConfig) -> Result<Self> {
        tracing::info!(
            "Initializing lorekeeper (embeddings: {:?}, index: {:?})...",
            config.embeddings.backend,
            config.vector_db.backend
        );

        let ollama = Arc::new(OllamaClient::from_config(&config.llm)?);
        tracing::info!("Ollama client initialized at {}", config.llm.base_url);

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
            EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::from_client(
                Arc::clone(&ollama),
                &config.embeddings,
            )),
            EmbeddingBackend::Onnx => Arc::new(OnnxEmbedder::new(&config.embeddings).await?),
        };
        if embedder.dimensions() != config.embeddings.dimensions {
            return Err(Error::Config(format!(
                "embedder produces {} dimensions but embeddings.dimensions is {}",
                embedder.dimensions(),
                config.embeddings.dimensions
            )));
        }

        let store: Arc<dyn VectorStoreProvider> = match config.vector_db.backend {
            VectorBackend::Qdrant => Arc::new(QdrantStore::new(&config.vector_db)?),
            VectorBackend::Memory => {
                tracing::warn!("Using the in-memory index; it is lost when the process exits");
                Arc::new(MemoryVectorStore::new())
            }
        };

        let llm: Arc<dyn LlmProvider> = Arc::new(OllamaLlm::from_client(ollama, &config.llm));

        let source: Option<Arc<dyn ContentSource>> = match config.portal.campaign_id {
            Some(_) => Some(Arc::new(ObsidianPortalClient::from_config(&config.portal)?)),
            None => {
                tracing::info!("No campaign configured; ingestion and portal tools are disabled");
                None
            }
        };

        let state = Self::from_parts(config, embedder, llm, store, source);

        match state.inner.indexer.ensure_collection(false).await {
            Ok(()) => state.set_ready(true),
            Err(e) => tracing::warn!("Vector index not ready: {}", e),
        }

        Ok(state)
    }

    /// Assemble the state from already-built providers
    ///
    /// The state starts out not ready.
    pub fn from_parts(
        config: LoreConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStoreProvider>,
        source: Option<Arc<dyn ContentSource>>,
    ) -> Self {
        let collection = config.vector_db.collection.clone();

        let indexer = Arc::new(Indexer::new(
            TextChunker::from_config(&config.chunking),
            Arc::clone(&store),
            collection.clone(),
            embedder.dimensions(),
        ));
        let retriever = Arc::new(Retriever::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            collection,
        ));
        let synthesizer = AnswerSynthesizer::new(Arc::clone(&retriever), Arc::clone(&llm));
        let tools = Arc::new(ToolRegistry::campaign(
            Arc::clone(&retriever),
            config.retrieval.top_k,
            source.clone(),
        ));
        let agent = AgentRunner::new(Arc::clone(&llm), Arc::clone(&tools), config.agent.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                embedder,
                llm,
                store,
                source,
                indexer,
                retriever,
                synthesizer,
                tools,
                agent,
                ingest_lock: tokio::sync::Mutex::new(()),
                ready: RwLock::new(false),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &LoreConfig {
        &self.inner.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.inner.store
    }

    pub fn source(&self) -> Option<&Arc<dyn ContentSource>> {
        self.inner.source.as_ref()
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.inner.retriever
    }

    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.inner.synthesizer
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.inner.tools
    }

    pub fn agent(&self) -> &AgentRunner {
        &self.inner.agent
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }

    /// Rebuild the index from the content source
    pub async fn ingest(&self) -> Result<IngestReport> {
        self.ingest_with_progress(|_, _| {}).await
    }

    /// Rebuild the index, reporting `(done, total)` after each document
    ///
    /// Runs are serialized; a second caller waits for the first to finish.
    pub async fn ingest_with_progress<F>(&self, on_progress: F) -> Result<IngestReport>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let source = self
            .source()
            .cloned()
            .ok_or_else(|| Error::Config("portal.campaign_id is not set".into()))?;

        let _guard = self.inner.ingest_lock.lock().await;
        let pipeline = IngestPipeline::from_config(
            &self.inner.config,
            source,
            Arc::clone(&self.inner.embedder),
            Arc::clone(&self.inner.indexer),
        );

        let report = pipeline.run_with_progress(on_progress).await?;
        self.set_ready(true);
        Ok(report)
    }
}
