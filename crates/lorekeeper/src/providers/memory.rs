//! Process-local vector store
//!
//! Brute-force cosine search over points held in memory. Used for the
//! `memory` backend and as the index behind unit tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::IndexPoint;

use super::vector_store::{MetadataFilter, ScoredPoint, VectorStoreProvider};

struct Collection {
    dimensions: usize,
    /// Insertion order is kept so equal scores rank deterministically
    points: Vec<IndexPoint>,
    positions: HashMap<Uuid, usize>,
}

/// Local vector store keeping every collection in memory
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity between two vectors (0.0 when either is zero)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(Error::index(format!("Collection '{}' already exists", name)));
        }
        collections.insert(
            name.to_string(),
            Collection {
                dimensions,
                points: Vec::new(),
                positions: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().remove(name);
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<usize> {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| Error::index(format!("Collection '{}' not found", collection)))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimensions) {
            return Err(Error::index(format!(
                "Point {} has {} dimensions, collection expects {}",
                bad.id,
                bad.vector.len(),
                target.dimensions
            )));
        }

        let written = points.len();
        for point in points {
            match target.positions.get(&point.id) {
                Some(&pos) => target.points[pos] = point,
                None => {
                    target.positions.insert(point.id, target.points.len());
                    target.points.push(point);
                }
            }
        }
        Ok(written)
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| Error::index(format!("Collection '{}' not found", collection)))?;

        let mut scored: Vec<ScoredPoint> = target
            .points
            .iter()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read();
        collections
            .get(collection)
            .map(|c| c.points.len())
            .ok_or_else(|| Error::index(format!("Collection '{}' not found", collection)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(vector: Vec<f32>, gm_only: bool) -> IndexPoint {
        IndexPoint {
            id: Uuid::new_v4(),
            vector,
            payload: json!({"content": "x", "gm_only": gm_only})
                .as_object()
                .cloned()
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_query_ranks_by_cosine() {
        let store = MemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let near = point(vec![1.0, 0.1], false);
        let far = point(vec![0.0, 1.0], false);
        let near_id = near.id;
        store.upsert("c", vec![far, near]).await.unwrap();

        let hits = store.query("c", &[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, near_id);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_filter_and_dimension_checks() {
        let store = MemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store
            .upsert("c", vec![point(vec![1.0, 0.0], true), point(vec![0.9, 0.1], false)])
            .await
            .unwrap();

        let filter = MetadataFilter::new().equals("gm_only", false);
        let hits = store.query("c", &[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload["gm_only"], false);

        let err = store.upsert("c", vec![point(vec![1.0], false)]).await;
        assert!(matches!(err, Err(Error::Index(_))));
    }

    #[tokio::test]
    async fn test_delete_and_recreate() {
        let store = MemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", vec![point(vec![1.0, 0.0], false)]).await.unwrap();
        assert!(store.collection_exists("c").await.unwrap());

        store.delete_collection("c").await.unwrap();
        assert!(!store.collection_exists("c").await.unwrap());
        assert!(store.query("c", &[1.0, 0.0], 1, None).await.is_err());

        store.create_collection("c", 2).await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
