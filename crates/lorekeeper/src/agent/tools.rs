//! Tools the agent can call, and the registry that dispatches them

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{check_record_id, ContentSource};
use crate::retrieval::{Retriever, SearchFilters, Snippet};
use crate::types::{DocumentKind, ToolCall, ToolDefinition};

/// Name of the retrieval tool
pub const SEARCH_TOOL: &str = "search_campaign_notes";

/// Reply of the retrieval tool when nothing matches
pub const NO_MATCHES: &str = "No matching campaign notes found.";

const MAX_TOP_K: usize = 20;

/// Access granted to one exchange
///
/// Fixed by the caller; nothing the model sends can change it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolContext {
    pub include_gm_only: bool,
}

impl ToolContext {
    pub fn new(include_gm_only: bool) -> Self {
        Self { include_gm_only }
    }
}

/// Text handed back to the model for one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    /// The call was rejected; the model may correct itself and retry
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    fn json(value: &impl Serialize) -> Result<Self> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }
}

/// A named capability with a JSON-schema argument description
///
/// `Err` from `call` aborts the exchange; argument mistakes should come back
/// as `ToolOutput::error` instead.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// Decode an argument object, turning shape errors into a tool-level error
fn parse_args<T: DeserializeOwned>(
    tool: &str,
    args: Map<String, Value>,
) -> std::result::Result<T, ToolOutput> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ToolOutput::error(format!("invalid arguments for {}: {}", tool, e)))
}

/// Tools available to one exchange, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The campaign toolset: retrieval, plus portal lookups when a source is given
    pub fn campaign(
        retriever: Arc<Retriever>,
        default_top_k: usize,
        source: Option<Arc<dyn ContentSource>>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(SearchTool::new(retriever, default_top_k));
        if let Some(source) = source {
            registry.register(FetchWikiPagesTool::new(Arc::clone(&source)));
            registry.register(FetchWikiPageTool::new(Arc::clone(&source)));
            registry.register(FetchCharactersTool::new(Arc::clone(&source)));
            registry.register(FetchCharacterTool::new(source));
        }
        registry
    }

    /// Add a tool; a tool with the same name is replaced in place
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        let name = tool.definition().name;
        match self.tools.iter().position(|t| t.definition().name == name) {
            Some(i) => self.tools[i] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.definition().name == name)
    }

    /// Run one call by name
    ///
    /// An unregistered name is answered with an error output. Arguments must
    /// be a JSON object (`null` counts as empty); anything else is a model
    /// error.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolOutput> {
        let Some(tool) = self.get(&call.name) else {
            tracing::warn!("Model called unknown tool '{}'", call.name);
            return Ok(ToolOutput::error(format!(
                "unknown tool '{}'; available tools: {}",
                call.name,
                self.names().join(", ")
            )));
        };

        let args = match &call.arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(Error::model(format!(
                    "arguments of tool call '{}' must be a JSON object, got {}",
                    call.name, other
                )))
            }
        };

        tracing::debug!("Dispatching {} ({})", call.name, call.id);
        tool.call(args, ctx).await
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    document_types: Vec<DocumentKind>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Semantic search over the indexed campaign notes
pub struct SearchTool {
    retriever: Arc<Retriever>,
    default_top_k: usize,
}

impl SearchTool {
    pub fn new(retriever: Arc<Retriever>, default_top_k: usize) -> Self {
        Self {
            retriever,
            default_top_k,
        }
    }

    /// Render snippets as numbered, titled passages
    pub fn format_snippets(snippets: &[Snippet]) -> String {
        if snippets.is_empty() {
            return NO_MATCHES.to_string();
        }
        snippets
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let kind = s.doc_type.as_deref().unwrap_or("note");
                format!(
                    "[{}] {} ({}, score {:.2})\n{}",
                    i + 1,
                    s.title,
                    kind,
                    s.score,
                    s.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL.to_string(),
            description: "Search the campaign notes (wiki pages, adventure log posts and \
                          characters) for passages relevant to a query. Returns the best \
                          matching passages with their titles."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look for, in natural language"
                    },
                    "top_k": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_TOP_K,
                        "description": "Number of passages to return"
                    },
                    "document_types": {
                        "type": "array",
                        "items": {"type": "string", "enum": ["WikiPage", "Post", "Character"]},
                        "description": "Only search these kinds of documents"
                    },
                    "tags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Only search documents carrying any of these tags"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let args: SearchArgs = match parse_args(SEARCH_TOOL, args) {
            Ok(args) => args,
            Err(output) => return Ok(output),
        };
        if args.query.trim().is_empty() {
            return Ok(ToolOutput::error("query must not be empty"));
        }

        let filters = SearchFilters {
            include_gm_only: ctx.include_gm_only,
            document_types: args.document_types,
            tags: args.tags,
            top_k: args.top_k.unwrap_or(self.default_top_k).clamp(1, MAX_TOP_K),
        };
        let snippets = self.retriever.search(&args.query, &filters).await?;
        Ok(ToolOutput::text(Self::format_snippets(&snippets)))
    }
}

#[derive(Debug, Serialize)]
struct PageSummary<'a> {
    id: &'a str,
    title: &'a str,
    #[serde(rename = "type")]
    kind: DocumentKind,
    tags: &'a [String],
    updated_at: &'a str,
}

#[derive(Debug, Serialize)]
struct CharacterSummary<'a> {
    id: &'a str,
    name: &'a str,
    is_player_character: bool,
    tags: &'a [String],
    updated_at: &'a str,
}

fn no_args() -> Value {
    json!({"type": "object", "properties": {}})
}

fn id_arg(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: {"type": "string", "description": description}
        },
        "required": [field]
    })
}

#[derive(Debug, Deserialize)]
struct PageArgs {
    page_id: String,
}

#[derive(Debug, Deserialize)]
struct CharacterArgs {
    character_id: String,
}

/// Lists wiki pages and adventure log posts
pub struct FetchWikiPagesTool {
    source: Arc<dyn ContentSource>,
}

impl FetchWikiPagesTool {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for FetchWikiPagesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fetch_wiki_pages".to_string(),
            description: "List the campaign's wiki pages and adventure log posts \
                          (id, title, type, tags)."
                .to_string(),
            parameters: no_args(),
        }
    }

    async fn call(&self, _args: Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let pages = self.source.list_wiki_pages().await?;
        let summaries: Vec<PageSummary<'_>> = pages
            .iter()
            .filter(|p| ctx.include_gm_only || !p.gm_only)
            .map(|p| PageSummary {
                id: &p.id,
                title: &p.title,
                kind: p.kind,
                tags: &p.tags,
                updated_at: &p.updated_at,
            })
            .collect();
        ToolOutput::json(&summaries)
    }
}

/// Fetches one wiki page or post in full
pub struct FetchWikiPageTool {
    source: Arc<dyn ContentSource>,
}

impl FetchWikiPageTool {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for FetchWikiPageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fetch_wiki_page".to_string(),
            description: "Fetch the full text of one wiki page or adventure log post by id."
                .to_string(),
            parameters: id_arg("page_id", "Page id as returned by fetch_wiki_pages"),
        }
    }

    async fn call(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let args: PageArgs = match parse_args("fetch_wiki_page", args) {
            Ok(args) => args,
            Err(output) => return Ok(output),
        };
        if let Err(err) = check_record_id(&args.page_id) {
            return Ok(ToolOutput::error(err.to_string()));
        }
        let page = self.source.get_wiki_page(&args.page_id).await?;
        if page.gm_only && !ctx.include_gm_only {
            return Ok(ToolOutput::error(format!(
                "page {} is not available",
                args.page_id
            )));
        }
        ToolOutput::json(&page)
    }
}

/// Lists characters
pub struct FetchCharactersTool {
    source: Arc<dyn ContentSource>,
}

impl FetchCharactersTool {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for FetchCharactersTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fetch_characters".to_string(),
            description: "List the campaign's characters (id, name, whether they are a \
                          player character, tags)."
                .to_string(),
            parameters: no_args(),
        }
    }

    async fn call(&self, _args: Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let characters = self.source.list_characters().await?;
        let summaries: Vec<CharacterSummary<'_>> = characters
            .iter()
            .filter(|c| ctx.include_gm_only || !c.gm_only)
            .map(|c| CharacterSummary {
                id: &c.id,
                name: &c.name,
                is_player_character: c.is_player_character,
                tags: &c.tags,
                updated_at: &c.updated_at,
            })
            .collect();
        ToolOutput::json(&summaries)
    }
}

/// Fetches one character with description and bio
pub struct FetchCharacterTool {
    source: Arc<dyn ContentSource>,
}

impl FetchCharacterTool {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for FetchCharacterTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fetch_character".to_string(),
            description: "Fetch one character's description and biography by id.".to_string(),
            parameters: id_arg("character_id", "Character id as returned by fetch_characters"),
        }
    }

    async fn call(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let args: CharacterArgs = match parse_args("fetch_character", args) {
            Ok(args) => args,
            Err(output) => return Ok(output),
        };
        if let Err(err) = check_record_id(&args.character_id) {
            return Ok(ToolOutput::error(err.to_string()));
        }
        let character = self.source.get_character(&args.character_id).await?;
        if character.gm_only && !ctx.include_gm_only {
            return Ok(ToolOutput::error(format!(
                "character {} is not available",
                args.character_id
            )));
        }
        ToolOutput::json(&character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{Indexer, TextChunker};
    use crate::providers::{MemoryVectorStore, VectorStoreProvider};
    use crate::testing::{character, page, wiki_page, HashingEmbedder, StaticContentSource};

    async fn retriever() -> Arc<Retriever> {
        let store: Arc<dyn VectorStoreProvider> = Arc::new(MemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new());
        let indexer = Indexer::new(
            TextChunker::default(),
            Arc::clone(&store),
            "notes",
            HashingEmbedder::DIMENSIONS,
        );
        indexer.ensure_collection(true).await.unwrap();
        for doc in [
            page("p1", "Greywood", "Greywood is a village of woodcutters.", false),
            page("p2", "Greywood Secrets", "Greywood hides a cult of the lich.", true),
        ] {
            indexer.index_document(&doc, embedder.as_ref()).await.unwrap();
        }
        Arc::new(Retriever::new(store, embedder, "notes"))
    }

    fn source() -> Arc<dyn ContentSource> {
        Arc::new(StaticContentSource {
            pages: vec![
                wiki_page("w1", "Greywood", "Village.", false),
                wiki_page("w2", "The Cult", "Hidden cult.", true),
            ],
            characters: vec![
                character("c1", "Mira", "Halfling rogue", "Grew up in Greywood.", false),
                character("c2", "The Lich", "Undead", "Ancient evil.", true),
            ],
            broken_characters: Vec::new(),
        })
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall::new("call_1", name, arguments)
    }

    #[tokio::test]
    async fn test_campaign_registry_contents() {
        let registry = ToolRegistry::campaign(retriever().await, 5, None);
        assert_eq!(registry.names(), vec![SEARCH_TOOL.to_string()]);

        let registry = ToolRegistry::campaign(retriever().await, 5, Some(source()));
        assert_eq!(registry.len(), 5);
        let search = &registry.definitions()[0];
        assert_eq!(search.parameters["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_search_never_widens_gm_access() {
        let registry = ToolRegistry::campaign(retriever().await, 5, None);

        let public = registry
            .dispatch(
                &call(SEARCH_TOOL, json!({"query": "Greywood", "top_k": 10})),
                &ToolContext::new(false),
            )
            .await
            .unwrap();
        assert!(!public.is_error);
        assert!(public.content.contains("woodcutters"));
        assert!(!public.content.contains("lich"));

        let gm = registry
            .dispatch(
                &call(SEARCH_TOOL, json!({"query": "Greywood", "top_k": 10})),
                &ToolContext::new(true),
            )
            .await
            .unwrap();
        assert!(gm.content.contains("lich"));
    }

    #[tokio::test]
    async fn test_search_without_matches() {
        let registry = ToolRegistry::campaign(retriever().await, 5, None);
        let output = registry
            .dispatch(
                &call(
                    SEARCH_TOOL,
                    json!({"query": "Greywood", "document_types": ["Character"]}),
                ),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::text(NO_MATCHES));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_output() {
        let registry = ToolRegistry::campaign(retriever().await, 5, None);
        let output = registry
            .dispatch(&call("cast_fireball", json!({})), &ToolContext::default())
            .await
            .unwrap();
        assert!(output.is_error);
        assert!(output.content.contains("unknown tool 'cast_fireball'"));
        assert!(output.content.contains(SEARCH_TOOL));
    }

    #[tokio::test]
    async fn test_argument_shapes() {
        let registry = ToolRegistry::campaign(retriever().await, 5, None);
        let ctx = ToolContext::default();

        let err = registry
            .dispatch(&call(SEARCH_TOOL, json!("Greywood")), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Model(_)));

        let missing = registry
            .dispatch(&call(SEARCH_TOOL, Value::Null), &ctx)
            .await
            .unwrap();
        assert!(missing.is_error);
        assert!(missing.content.contains("invalid arguments"));

        let wrong_type = registry
            .dispatch(&call(SEARCH_TOOL, json!({"query": 42})), &ctx)
            .await
            .unwrap();
        assert!(wrong_type.is_error);
    }

    #[tokio::test]
    async fn test_portal_tools_hide_gm_records() {
        let registry = ToolRegistry::campaign(retriever().await, 5, Some(source()));
        let ctx = ToolContext::default();

        let pages = registry
            .dispatch(&call("fetch_wiki_pages", json!({})), &ctx)
            .await
            .unwrap();
        let listed: Vec<Value> = serde_json::from_str(&pages.content).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["title"], "Greywood");

        let hidden = registry
            .dispatch(&call("fetch_character", json!({"character_id": "c2"})), &ctx)
            .await
            .unwrap();
        assert!(hidden.is_error);

        let mira = registry
            .dispatch(&call("fetch_character", json!({"character_id": "c1"})), &ctx)
            .await
            .unwrap();
        assert!(mira.content.contains("Grew up in Greywood."));

        let gm_pages = registry
            .dispatch(&call("fetch_wiki_page", json!({"page_id": "w2"})), &ToolContext::new(true))
            .await
            .unwrap();
        assert!(gm_pages.content.contains("Hidden cult."));
    }

    #[tokio::test]
    async fn test_portal_tools_reject_path_like_ids() {
        let registry = ToolRegistry::campaign(retriever().await, 5, Some(source()));
        let ctx = ToolContext::new(true);

        let page = registry
            .dispatch(
                &call("fetch_wiki_page", json!({"page_id": "../../other/wikis/w1"})),
                &ctx,
            )
            .await
            .unwrap();
        assert!(page.is_error);
        assert!(page.content.contains("not a valid record id"));

        let character = registry
            .dispatch(&call("fetch_character", json!({"character_id": "c1.json"})), &ctx)
            .await
            .unwrap();
        assert!(character.is_error);
    }
}
