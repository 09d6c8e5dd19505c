//! Similarity search over indexed campaign notes

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, MetadataFilter, ScoredPoint, VectorStoreProvider};
use crate::types::{DocumentKind, CONTENT_KEY, GM_ONLY_KEY, TAGS_KEY, TITLE_KEY, TYPE_KEY};

/// Title used when a stored chunk carries none
pub const UNTITLED: &str = "<no title>";

/// Retrieved context for one question
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    /// Chunk texts, best match first
    pub contexts: Vec<String>,
    /// Distinct source titles
    pub titles: BTreeSet<String>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Narrowing options for a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Also search game-master-only notes
    pub include_gm_only: bool,
    /// Restrict to these document kinds (any of)
    pub document_types: Vec<DocumentKind>,
    /// Restrict to chunks carrying any of these tags
    pub tags: Vec<String>,
    /// Maximum number of snippets
    pub top_k: usize,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            include_gm_only: false,
            document_types: Vec::new(),
            tags: Vec::new(),
            top_k: 5,
        }
    }
}

impl SearchFilters {
    /// Payload filter enforcing these options
    pub fn to_metadata_filter(&self) -> MetadataFilter {
        let mut filter = MetadataFilter::new();
        if !self.include_gm_only {
            filter = filter.equals(GM_ONLY_KEY, false);
        }
        if !self.document_types.is_empty() {
            filter = filter.any_of(
                TYPE_KEY,
                self.document_types.iter().map(|k| json!(k.as_str())).collect(),
            );
        }
        if !self.tags.is_empty() {
            filter = filter.any_of(TAGS_KEY, self.tags.iter().map(|t| json!(t)).collect());
        }
        filter
    }
}

/// A ranked piece of campaign text with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub content: String,
    pub title: String,
    pub doc_type: Option<String>,
    pub source_url: Option<String>,
    pub score: f32,
    pub chunk_index: Option<u64>,
}

impl Snippet {
    fn from_point(point: ScoredPoint) -> Option<Self> {
        let text = |payload: &Map<String, Value>, key: &str| {
            payload.get(key).and_then(Value::as_str).map(String::from)
        };

        let content = text(&point.payload, CONTENT_KEY).filter(|c| !c.is_empty())?;
        Some(Self {
            content,
            title: text(&point.payload, TITLE_KEY).unwrap_or_else(|| UNTITLED.to_string()),
            doc_type: text(&point.payload, TYPE_KEY),
            source_url: text(&point.payload, "source_url"),
            score: point.score,
            chunk_index: point.payload.get("chunk_index").and_then(Value::as_u64),
        })
    }
}

/// Embeds questions and queries the vector index
///
/// Must use the same embedding provider as the ingestion run that built the
/// collection.
pub struct Retriever {
    store: Arc<dyn VectorStoreProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
        }
    }

    /// Ranked snippets for a free-text query
    pub async fn search(&self, query: &str, filters: &SearchFilters) -> Result<Vec<Snippet>> {
        let vector = self.embedder.embed(query).await?;
        let filter = filters.to_metadata_filter();

        let points = self
            .store
            .query(&self.collection, &vector, filters.top_k, Some(&filter))
            .await?;

        let snippets: Vec<Snippet> = points.into_iter().filter_map(Snippet::from_point).collect();
        tracing::debug!(
            "Search '{}' returned {} snippets (gm_only included: {})",
            query,
            snippets.len(),
            filters.include_gm_only
        );
        Ok(snippets)
    }

    /// Context texts and source titles for a question
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
        include_gm_only: bool,
    ) -> Result<RetrievalResult> {
        let filters = SearchFilters {
            include_gm_only,
            top_k,
            ..SearchFilters::default()
        };

        let mut result = RetrievalResult::default();
        for snippet in self.search(question, &filters).await? {
            result.titles.insert(snippet.title);
            result.contexts.push(snippet.content);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{Indexer, TextChunker};
    use crate::providers::MemoryVectorStore;
    use crate::testing::{page, HashingEmbedder};
    use crate::types::{Document, Page};
    use uuid::Uuid;

    async fn indexed(docs: Vec<Document>) -> (Arc<MemoryVectorStore>, Retriever) {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new());
        let indexer = Indexer::new(
            TextChunker::default(),
            Arc::clone(&store) as Arc<dyn VectorStoreProvider>,
            "notes",
            HashingEmbedder::DIMENSIONS,
        );
        indexer.ensure_collection(true).await.unwrap();
        for doc in &docs {
            indexer.index_document(doc, embedder.as_ref()).await.unwrap();
        }
        let retriever = Retriever::new(Arc::clone(&store) as Arc<dyn VectorStoreProvider>, embedder, "notes");
        (store, retriever)
    }

    fn tagged(id: &str, title: &str, body: &str, tags: &[&str]) -> Document {
        match page(id, title, body, false) {
            Document::Page(p) => Document::Page(Page {
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..p
            }),
            other => other,
        }
    }

    #[tokio::test]
    async fn test_gm_only_excluded_by_default() {
        let (_, retriever) = indexed(vec![
            page("p1", "Vault", "The Sunken Vault lies beneath the lake.", false),
            page("p2", "Secret", "The Sunken Vault holds the lich's phylactery.", true),
        ])
        .await;

        let public = retriever.retrieve("Sunken Vault", 10, false).await.unwrap();
        assert_eq!(public.contexts.len(), 1);
        assert!(public.titles.contains("Vault"));
        assert!(!public.titles.contains("Secret"));

        let gm = retriever.retrieve("Sunken Vault", 10, true).await.unwrap();
        assert_eq!(gm.contexts.len(), 2);
        assert!(gm.titles.contains("Secret"));
    }

    #[tokio::test]
    async fn test_empty_index_is_not_an_error() {
        let (_, retriever) = indexed(Vec::new()).await;
        let result = retriever.retrieve("anything", 5, false).await.unwrap();
        assert!(result.is_empty());
        assert!(result.titles.is_empty());
    }

    #[tokio::test]
    async fn test_titles_deduplicated_and_ranked_contexts() {
        let body = (0..12)
            .map(|i| format!("Greywood fact number {} about the haunted forest and its wolves.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let (_, retriever) = indexed(vec![
            page("p1", "Greywood", &body, false),
            page("p2", "Market", "Bread costs two copper.", false),
        ])
        .await;

        let result = retriever.retrieve("haunted forest wolves", 3, false).await.unwrap();
        assert!(result.contexts.len() <= 3);
        assert!(result.contexts[0].contains("Greywood fact"));
        assert!(result.titles.contains("Greywood"));
        assert!(result.titles.len() <= result.contexts.len());
    }

    #[tokio::test]
    async fn test_missing_title_and_content() {
        let (store, retriever) = indexed(Vec::new()).await;
        let vector = HashingEmbedder::vector("orphan note");
        let payloads = [
            json!({"content": "orphan note", "gm_only": false}),
            json!({"title": "Empty", "gm_only": false}),
        ];
        let points = payloads
            .iter()
            .map(|p| crate::types::IndexPoint {
                id: Uuid::new_v4(),
                vector: vector.clone(),
                payload: p.as_object().cloned().unwrap(),
            })
            .collect();
        store.upsert("notes", points).await.unwrap();

        let result = retriever.retrieve("orphan note", 5, false).await.unwrap();
        assert_eq!(result.contexts, vec!["orphan note".to_string()]);
        assert!(result.titles.contains(UNTITLED));
    }

    #[tokio::test]
    async fn test_search_filters_narrow_by_type_and_tag() {
        let (_, retriever) = indexed(vec![
            tagged("p1", "Greywood", "Wolves roam the forest.", &["location"]),
            tagged("p2", "Session 3", "The party fought wolves.", &["session"]),
        ])
        .await;

        let filters = SearchFilters {
            tags: vec!["session".to_string()],
            ..SearchFilters::default()
        };
        let snippets = retriever.search("wolves", &filters).await.unwrap();
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].title, "Session 3");
        assert_eq!(snippets[0].doc_type.as_deref(), Some("WikiPage"));
        assert_eq!(snippets[0].chunk_index, Some(0));

        let filters = SearchFilters {
            document_types: vec![DocumentKind::Character],
            ..SearchFilters::default()
        };
        assert!(retriever.search("wolves", &filters).await.unwrap().is_empty());
    }
}
