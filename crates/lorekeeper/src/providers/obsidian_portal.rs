//! Obsidian Portal content source
//!
//! Authentication is handled outside this crate. A `PortalSession` carries an
//! HTTP client plus a `RequestSigner` that produces the `Authorization`
//! header for each request; sessions are built explicitly and passed in.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::types::{Character, Page};

use super::content_source::{check_record_id, ContentSource};

const SERVICE: &str = "obsidian-portal";

/// Produces the `Authorization` header value for an outgoing request
pub trait RequestSigner: Send + Sync {
    fn authorization(&self, method: &Method, url: &str) -> Result<String>;
}

/// Signer that sends a fixed, pre-computed header value
pub struct StaticAuthorization(String);

impl StaticAuthorization {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl RequestSigner for StaticAuthorization {
    fn authorization(&self, _method: &Method, _url: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Authenticated HTTP session against the portal
#[derive(Clone)]
pub struct PortalSession {
    client: Client,
    signer: Option<Arc<dyn RequestSigner>>,
    timeout_secs: u64,
}

impl PortalSession {
    /// Create a session from an existing client and optional signer
    pub fn new(client: Client, signer: Option<Arc<dyn RequestSigner>>, timeout_secs: u64) -> Self {
        Self {
            client,
            signer,
            timeout_secs,
        }
    }

    /// Build a session from configuration, using the configured header verbatim
    pub fn from_config(config: &PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let signer = config
            .authorization
            .clone()
            .map(|value| Arc::new(StaticAuthorization::new(value)) as Arc<dyn RequestSigner>);

        Ok(Self::new(client, signer, config.timeout_secs))
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.client.get(url);
        if let Some(signer) = &self.signer {
            request = request.header(
                reqwest::header::AUTHORIZATION,
                signer.authorization(&Method::GET, url)?,
            );
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout("obsidian portal request", self.timeout_secs)
            } else {
                Error::transport(SERVICE, e.to_string())
            }
        })?;

        let status = response.status();
        tracing::debug!(%url, %status, "Portal response");
        if let Some(error) = status_error(status, url) {
            return Err(error);
        }

        response
            .json()
            .await
            .map_err(|e| Error::transport(SERVICE, format!("Failed to parse {}: {}", url, e)))
    }
}

fn status_error(status: StatusCode, url: &str) -> Option<Error> {
    match status {
        s if s.is_success() => None,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(Error::Auth(format!(
            "Obsidian Portal rejected the session (HTTP {})",
            status.as_u16()
        ))),
        _ => Some(Error::transport(
            SERVICE,
            format!("HTTP {} for {}", status.as_u16(), url),
        )),
    }
}

/// Obsidian Portal REST client bound to one campaign
pub struct ObsidianPortalClient {
    session: PortalSession,
    base_url: String,
    campaign_id: String,
}

impl ObsidianPortalClient {
    pub fn new(
        session: PortalSession,
        base_url: impl Into<String>,
        campaign_id: impl Into<String>,
    ) -> Self {
        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            campaign_id: campaign_id.into(),
        }
    }

    /// Build a client from configuration; a campaign id is required
    pub fn from_config(config: &PortalConfig) -> Result<Self> {
        let campaign_id = config
            .campaign_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::Config("portal.campaign_id is not set".into()))?;

        Ok(Self::new(
            PortalSession::from_config(config)?,
            &config.base_url,
            campaign_id,
        ))
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/campaigns/{}/{}", self.base_url, self.campaign_id, path)
    }
}

#[async_trait]
impl ContentSource for ObsidianPortalClient {
    async fn list_wiki_pages(&self) -> Result<Vec<Page>> {
        let url = self.url("wikis.json");
        tracing::info!("Fetching wiki pages from {}", url);
        let pages: Vec<Page> = self.session.get_json(&url).await?;
        tracing::info!("Fetched {} wiki pages", pages.len());
        Ok(pages)
    }

    async fn get_wiki_page(&self, page_id: &str) -> Result<Page> {
        let page_id = check_record_id(page_id)?;
        self.session
            .get_json(&self.url(&format!("wikis/{}.json", page_id)))
            .await
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        let url = self.url("characters.json");
        tracing::info!("Fetching characters from {}", url);
        let characters: Vec<Character> = self.session.get_json(&url).await?;
        tracing::info!("Fetched {} characters", characters.len());
        Ok(characters)
    }

    async fn get_character(&self, character_id: &str) -> Result<Character> {
        let character_id = check_record_id(character_id)?;
        self.session
            .get_json(&self.url(&format!("characters/{}.json", character_id)))
            .await
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::HeaderMap, routing::get, Json, Router};
    use serde_json::{json, Value};

    fn page_json(id: &str) -> Value {
        json!({
            "id": id,
            "type": "WikiPage",
            "name": "Greywood",
            "body": "A haunted forest.",
            "wiki_page_url": "https://example.test/wikis/greywood",
            "tags": ["location"],
            "is_game_master_only": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        })
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn portal_router() -> Router {
        Router::new()
            .route(
                "/campaigns/c1/wikis.json",
                get(|headers: HeaderMap| async move {
                    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                        Some("OAuth token") => Ok(Json(json!([page_json("p1")]))),
                        _ => Err(axum::http::StatusCode::UNAUTHORIZED),
                    }
                }),
            )
            .route(
                "/campaigns/c1/characters/:id",
                get(|Path(id): Path<String>| async move {
                    Json(json!({
                        "id": id.trim_end_matches(".json"),
                        "name": "Mira",
                        "description": "A rogue.",
                        "bio": "Born in Greywood.",
                        "is_player_character": true,
                        "character_url": "https://example.test/characters/mira",
                        "tags": [],
                        "is_game_master_only": false,
                        "created_at": "2024-01-01",
                        "updated_at": "2024-01-01"
                    }))
                }),
            )
    }

    fn client(base_url: &str, authorization: Option<&str>) -> ObsidianPortalClient {
        let config = PortalConfig {
            base_url: base_url.to_string(),
            campaign_id: Some("c1".to_string()),
            authorization: authorization.map(String::from),
            ..PortalConfig::default()
        };
        ObsidianPortalClient::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_signed_listing_and_detail() {
        let base = serve(portal_router()).await;
        let client = client(&base, Some("OAuth token"));

        let pages = client.list_wiki_pages().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Greywood");
        assert_eq!(pages[0].kind, crate::types::DocumentKind::WikiPage);

        let mira = client.get_character("ch1").await.unwrap();
        assert_eq!(mira.id, "ch1");
        assert_eq!(mira.bio, "Born in Greywood.");
    }

    #[tokio::test]
    async fn test_rejected_session_is_auth_error() {
        let base = serve(portal_router()).await;
        let client = client(&base, None);

        let err = client.list_wiki_pages().await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_ids_cannot_leave_the_campaign() {
        let hits = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
        let seen = Arc::clone(&hits);
        let router = Router::new().fallback(move |uri: axum::http::Uri| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push(uri.path().to_string());
                Json(page_json("secret"))
            }
        });
        let base = serve(router).await;
        let client = client(&base, Some("OAuth token"));

        let err = client
            .get_wiki_page("../../other-campaign/wikis/secret")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        let err = client.get_character("../../c2/characters/x").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(hits.lock().is_empty());

        client.get_wiki_page("p1").await.unwrap();
        assert_eq!(*hits.lock(), vec!["/campaigns/c1/wikis/p1.json".to_string()]);
    }

    #[test]
    fn test_missing_campaign_is_config_error() {
        let err = ObsidianPortalClient::from_config(&PortalConfig::default());
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_status_mapping() {
        assert!(status_error(StatusCode::OK, "u").is_none());
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "u"),
            Some(Error::Auth(_))
        ));
        assert!(status_error(StatusCode::BAD_GATEWAY, "u").map_or(false, |e| e.is_transport()));
    }
}
