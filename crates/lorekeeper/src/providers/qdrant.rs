//! Qdrant vector store over its REST API
//!
//! Collections use cosine distance. When a vector name is configured the
//! collection holds a single named vector, which is how collections created
//! by fastembed-based tooling are laid out.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::IndexPoint;

use super::vector_store::{MetadataFilter, ScoredPoint, VectorStoreProvider};

const SERVICE: &str = "qdrant";

/// Qdrant REST client
pub struct QdrantStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    vector_name: Option<String>,
    hnsw_ef: usize,
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Deserialize)]
struct QueryResult {
    points: Vec<QdrantPoint>,
}

#[derive(Deserialize)]
struct QdrantPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

impl QdrantStore {
    /// Create a new Qdrant store from configuration
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            vector_name: config.vector_name.clone(),
            hnsw_ef: config.hnsw_ef,
            timeout_secs: config.timeout_secs,
        })
    }

    fn collection_url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, collection, suffix)
    }

    async fn send(&self, method: Method, url: String, body: Option<Value>) -> Result<reqwest::Response> {
        let mut request = self.client.request(method, &url);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout("qdrant request", self.timeout_secs)
            } else {
                Error::transport(SERVICE, e.to_string())
            }
        })
    }

    async fn checked(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Auth(format!("Qdrant rejected credentials during {}", action)))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::index(format!("{} failed: HTTP {} - {}", action, status, body)))
            }
        }
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: reqwest::Response, action: &str) -> Result<T> {
        let parsed: QdrantResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::index(format!("Failed to parse {} response: {}", action, e)))?;
        Ok(parsed.result)
    }

    fn collection_body(&self, dimensions: usize) -> Value {
        let params = json!({ "size": dimensions, "distance": "Cosine" });
        match &self.vector_name {
            Some(name) => json!({ "vectors": named(name, params) }),
            None => json!({ "vectors": params }),
        }
    }

    fn point_body(&self, point: &IndexPoint) -> Value {
        let vector = match &self.vector_name {
            Some(name) => named(name, json!(point.vector)),
            None => json!(point.vector),
        };
        json!({ "id": point.id, "vector": vector, "payload": point.payload })
    }

    fn query_body(&self, vector: &[f32], top_k: usize, filter: Option<&MetadataFilter>) -> Value {
        let mut body = json!({
            "query": vector,
            "limit": top_k,
            "with_payload": true,
            "params": { "hnsw_ef": self.hnsw_ef },
        });
        if let Some(name) = &self.vector_name {
            body["using"] = json!(name);
        }
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = filter.to_qdrant();
        }
        body
    }
}

fn named(name: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(name.to_string(), value);
    Value::Object(map)
}

fn parse_point_id(id: &Value) -> Result<Uuid> {
    id.as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| Error::index(format!("Unexpected point id {}", id)))
}

#[async_trait]
impl VectorStoreProvider for QdrantStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        tracing::info!(collection = name, dimensions, "Creating Qdrant collection");
        let response = self
            .send(
                Method::PUT,
                self.collection_url(name, ""),
                Some(self.collection_body(dimensions)),
            )
            .await?;
        Self::checked(response, "create collection").await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .send(Method::DELETE, self.collection_url(name, ""), None)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::checked(response, "delete collection").await?;
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .send(Method::GET, self.collection_url(name, "/exists"), None)
            .await?;
        let response = Self::checked(response, "collection exists").await?;
        let result: ExistsResult = Self::parse(response, "collection exists").await?;
        Ok(result.exists)
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }

        let written = points.len();
        let body = json!({
            "points": points.iter().map(|p| self.point_body(p)).collect::<Vec<_>>()
        });
        let response = self
            .send(
                Method::PUT,
                self.collection_url(collection, "/points?wait=true"),
                Some(body),
            )
            .await?;
        Self::checked(response, "upsert").await?;

        tracing::debug!(collection, written, "Upserted points");
        Ok(written)
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let response = self
            .send(
                Method::POST,
                self.collection_url(collection, "/points/query"),
                Some(self.query_body(vector, top_k, filter)),
            )
            .await?;
        let response = Self::checked(response, "query").await?;
        let result: QueryResult = Self::parse(response, "query").await?;

        result
            .points
            .into_iter()
            .map(|p| {
                Ok(ScoredPoint {
                    id: parse_point_id(&p.id)?,
                    score: p.score,
                    payload: p.payload.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .send(
                Method::POST,
                self.collection_url(collection, "/points/count"),
                Some(json!({ "exact": true })),
            )
            .await?;
        let response = Self::checked(response, "count").await?;
        let result: CountResult = Self::parse(response, "count").await?;
        Ok(result.count)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.send(Method::GET, format!("{}/readyz", self.base_url), None).await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(vector_name: Option<&str>) -> QdrantStore {
        QdrantStore::new(&VectorDbConfig {
            vector_name: vector_name.map(String::from),
            ..VectorDbConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_named_vector_bodies() {
        let store = store(Some("fast-all-minilm-l6-v2"));

        assert_eq!(
            store.collection_body(384),
            json!({"vectors": {"fast-all-minilm-l6-v2": {"size": 384, "distance": "Cosine"}}})
        );

        let point = IndexPoint {
            id: Uuid::nil(),
            vector: vec![0.5, 0.5],
            payload: Map::new(),
        };
        let body = store.point_body(&point);
        assert_eq!(body["vector"]["fast-all-minilm-l6-v2"], json!([0.5, 0.5]));
        assert_eq!(body["id"], json!(Uuid::nil().to_string()));
    }

    #[test]
    fn test_query_body() {
        let store = store(Some("v"));
        let filter = MetadataFilter::new().equals("gm_only", false);

        let body = store.query_body(&[1.0, 0.0], 5, Some(&filter));
        assert_eq!(body["using"], "v");
        assert_eq!(body["limit"], 5);
        assert_eq!(body["params"]["hnsw_ef"], 128);
        assert_eq!(body["filter"]["must"][0]["key"], "gm_only");

        let body = store.query_body(&[1.0], 3, Some(&MetadataFilter::new()));
        assert!(body.get("filter").is_none());
    }

    #[test]
    fn test_unnamed_vector_bodies() {
        let store = store(None);
        assert_eq!(
            store.collection_body(4),
            json!({"vectors": {"size": 4, "distance": "Cosine"}})
        );
        assert!(store.query_body(&[1.0], 1, None).get("using").is_none());
    }

    #[test]
    fn test_parse_point_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_point_id(&json!(id.to_string())).unwrap(), id);
        assert!(parse_point_id(&json!(7)).is_err());
    }
}
