//! Turns documents into embedded index points and writes them to the index

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Chunk, Document, IndexPoint};

use super::chunker::TextChunker;

/// Chunks, embeds and persists documents into one collection
pub struct Indexer {
    chunker: TextChunker,
    store: Arc<dyn VectorStoreProvider>,
    collection: String,
    dimensions: usize,
}

impl Indexer {
    pub fn new(
        chunker: TextChunker,
        store: Arc<dyn VectorStoreProvider>,
        collection: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            chunker,
            store,
            collection: collection.into(),
            dimensions,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection; with `rebuild`, drop any existing one first
    pub async fn ensure_collection(&self, rebuild: bool) -> Result<()> {
        let exists = self.store.collection_exists(&self.collection).await?;

        if exists && rebuild {
            tracing::info!("Deleting existing collection '{}'", self.collection);
            self.store.delete_collection(&self.collection).await?;
        } else if exists {
            return Ok(());
        }

        self.store
            .create_collection(&self.collection, self.dimensions)
            .await?;
        tracing::info!(
            "Collection '{}' is ready ({} dimensions, cosine)",
            self.collection,
            self.dimensions
        );
        Ok(())
    }

    /// Chunk and embed one document without touching the index
    ///
    /// Either every chunk gets a vector or the whole document fails. Empty
    /// content yields no points and makes no embedding call.
    pub async fn prepare(
        &self,
        document: &Document,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<IndexPoint>> {
        let texts = self.chunker.chunk(&document.content());
        if texts.is_empty() {
            tracing::debug!("Document {} has no content, skipping", document.id());
            return Ok(Vec::new());
        }

        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Embedding count mismatch for document {}: {} chunks, {} vectors",
                document.id(),
                texts.len(),
                vectors.len()
            )));
        }

        let metadata = document.metadata();
        let total = texts.len();
        let points = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (text, vector))| {
                IndexPoint::new(&Chunk { text, index, total }, vector, &metadata)
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Prepared {} points for '{}' ({})",
            points.len(),
            document.title(),
            document.kind()
        );
        Ok(points)
    }

    /// Persist prepared points
    pub async fn upsert(&self, points: Vec<IndexPoint>) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }
        self.store.upsert(&self.collection, points).await
    }

    /// Prepare then upsert one document
    pub async fn index_document(
        &self,
        document: &Document,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<usize> {
        let points = self.prepare(document, embedder).await?;
        self.upsert(points).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryVectorStore;
    use crate::testing::{page, FailingEmbedder, HashingEmbedder};
    use crate::types::CONTENT_KEY;

    fn indexer(store: Arc<MemoryVectorStore>) -> Indexer {
        Indexer::new(TextChunker::new(120, 20), store, "notes", HashingEmbedder::DIMENSIONS)
    }

    #[tokio::test]
    async fn test_prepare_builds_one_point_per_chunk() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(store);
        let body = (0..6)
            .map(|i| format!("Paragraph {} about the Sunken Vault and its guardians.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let doc = page("p1", "The Sunken Vault", &body, false);

        let points = indexer.prepare(&doc, &HashingEmbedder::new()).await.unwrap();

        assert!(points.len() > 1);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.vector.len(), HashingEmbedder::DIMENSIONS);
            assert_eq!(point.payload["chunk_index"], i);
            assert_eq!(point.payload["total_chunks"], points.len());
            assert_eq!(point.payload["title"], "The Sunken Vault");
            assert_eq!(point.payload["gm_only"], false);
            assert!(point.payload.get(CONTENT_KEY).is_some());
        }
        let ids: std::collections::HashSet<_> = points.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), points.len());
    }

    #[tokio::test]
    async fn test_one_batched_embedding_call_per_document() {
        let indexer = indexer(Arc::new(MemoryVectorStore::new()));
        let body = (0..8)
            .map(|i| format!("Entry {} of the harbour ledger, with tides and tolls.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let embedder = HashingEmbedder::new();

        let points = indexer
            .prepare(&page("p1", "Harbour Ledger", &body, false), &embedder)
            .await
            .unwrap();

        assert!(points.len() > 2);
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_document_makes_no_embedding_call() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(store);
        let doc = page("p1", "Blank", "  \n \n", false);

        // The failing embedder would error if it were called
        let points = indexer.prepare(&doc, &FailingEmbedder).await.unwrap();
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_index_untouched() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(Arc::clone(&store));
        indexer.ensure_collection(true).await.unwrap();

        let doc = page("p1", "Vault", "Some lore.", false);
        let err = indexer.index_document(&doc, &FailingEmbedder).await;

        assert!(matches!(err, Err(Error::Embedding(_))));
        assert_eq!(store.count("notes").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ensure_collection_rebuild_drops_points() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(Arc::clone(&store));
        let embedder = HashingEmbedder::new();

        indexer.ensure_collection(true).await.unwrap();
        let written = indexer
            .index_document(&page("p1", "Vault", "Some lore.", false), &embedder)
            .await
            .unwrap();
        assert_eq!(written, 1);

        indexer.ensure_collection(false).await.unwrap();
        assert_eq!(store.count("notes").await.unwrap(), 1);

        indexer.ensure_collection(true).await.unwrap();
        assert_eq!(store.count("notes").await.unwrap(), 0);
    }
}
