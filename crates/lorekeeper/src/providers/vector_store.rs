//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::types::IndexPoint;

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Point id
    pub id: Uuid,
    /// Cosine similarity (higher is more similar)
    pub score: f32,
    /// Stored payload
    pub payload: Map<String, Value>,
}

/// A single payload condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value; array fields match when any element equals it
    Equals { key: String, value: Value },
    /// Field equals any of the values; array fields match on any overlap
    AnyOf { key: String, values: Vec<Value> },
}

impl Condition {
    fn matches(&self, payload: &Map<String, Value>) -> bool {
        match self {
            Self::Equals { key, value } => field_values(payload, key).any(|v| v == value),
            Self::AnyOf { key, values } => {
                field_values(payload, key).any(|v| values.iter().any(|want| want == v))
            }
        }
    }

    fn to_qdrant(&self) -> Value {
        match self {
            Self::Equals { key, value } => json!({ "key": key, "match": { "value": value } }),
            Self::AnyOf { key, values } => json!({ "key": key, "match": { "any": values } }),
        }
    }
}

fn field_values<'a>(
    payload: &'a Map<String, Value>,
    key: &str,
) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
    match payload.get(key) {
        Some(Value::Array(items)) => Box::new(items.iter()),
        Some(value) => Box::new(std::iter::once(value)),
        None => Box::new(std::iter::empty()),
    }
}

/// Conjunction of payload conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    pub must: Vec<Condition>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key == value`
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must.push(Condition::Equals {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Require `key` to match one of `values`
    pub fn any_of(mut self, key: impl Into<String>, values: Vec<Value>) -> Self {
        self.must.push(Condition::AnyOf {
            key: key.into(),
            values,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Evaluate against a stored payload
    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        self.must.iter().all(|c| c.matches(payload))
    }

    /// Qdrant filter JSON
    pub fn to_qdrant(&self) -> Value {
        json!({ "must": self.must.iter().map(Condition::to_qdrant).collect::<Vec<_>>() })
    }
}

/// Trait for vector storage and similarity search
///
/// The store is shared by concurrent ingestion tasks; implementations must
/// accept concurrent upserts of distinct points.
///
/// Implementations:
/// - `QdrantStore`: Qdrant REST API
/// - `MemoryVectorStore`: Process-local brute force index
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create a collection for vectors of `dimensions` with cosine distance
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a collection and every point in it
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Check whether a collection exists
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Insert or replace points, returning how many were written
    async fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<usize>;

    /// Nearest neighbours of `vector`, best first, payload included
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Number of points in a collection
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_matches_scalars_and_arrays() {
        let p = payload(json!({"gm_only": false, "tags": ["npc", "villain"], "type": "Character"}));

        assert!(MetadataFilter::new().matches(&p));
        assert!(MetadataFilter::new().equals("gm_only", false).matches(&p));
        assert!(!MetadataFilter::new().equals("gm_only", true).matches(&p));
        assert!(MetadataFilter::new().equals("tags", "villain").matches(&p));
        assert!(MetadataFilter::new()
            .any_of("type", vec![json!("WikiPage"), json!("Character")])
            .matches(&p));
        assert!(!MetadataFilter::new()
            .any_of("tags", vec![json!("location")])
            .matches(&p));
        assert!(!MetadataFilter::new().equals("missing", 1).matches(&p));
    }

    #[test]
    fn test_filter_qdrant_json() {
        let filter = MetadataFilter::new()
            .equals("gm_only", false)
            .any_of("tags", vec![json!("npc")]);

        assert_eq!(
            filter.to_qdrant(),
            json!({"must": [
                {"key": "gm_only", "match": {"value": false}},
                {"key": "tags", "match": {"any": ["npc"]}}
            ]})
        );
    }
}
