//! Campaign documents and the index points derived from them

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Payload key holding the chunk text
pub const CONTENT_KEY: &str = "content";
/// Payload key holding the document title
pub const TITLE_KEY: &str = "title";
/// Payload key holding the access flag
pub const GM_ONLY_KEY: &str = "gm_only";
/// Payload key holding the document type tag
pub const TYPE_KEY: &str = "type";
/// Payload key holding the tag list
pub const TAGS_KEY: &str = "tags";

/// Kind of campaign document as tagged by the content source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Regular wiki page
    WikiPage,
    /// Adventure log post (session summary)
    Post,
    /// Character sheet
    Character,
}

impl DocumentKind {
    /// Tag stored in index payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WikiPage => "WikiPage",
            Self::Post => "Post",
            Self::Character => "Character",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wiki page or adventure log post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    #[serde(alias = "wiki_page_url")]
    pub source_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(alias = "is_game_master_only", default)]
    pub gm_only: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A character sheet
///
/// The listing endpoint omits `description` and `bio`; both default to empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bio: String,
    #[serde(default)]
    pub is_player_character: bool,
    #[serde(alias = "character_url")]
    pub source_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(alias = "is_game_master_only", default)]
    pub gm_only: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A unit of campaign knowledge
///
/// Documents only live for the duration of an ingestion run; after their
/// chunks are upserted they are dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Document {
    Page(Page),
    Character(Character),
}

impl Document {
    /// Stable upstream identifier
    pub fn id(&self) -> &str {
        match self {
            Self::Page(page) => &page.id,
            Self::Character(character) => &character.id,
        }
    }

    /// Document kind
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Page(page) => page.kind,
            Self::Character(_) => DocumentKind::Character,
        }
    }

    /// Display title (page title or character name)
    pub fn title(&self) -> &str {
        match self {
            Self::Page(page) => &page.title,
            Self::Character(character) => &character.name,
        }
    }

    /// Whether the document is restricted to the game master
    pub fn gm_only(&self) -> bool {
        match self {
            Self::Page(page) => page.gm_only,
            Self::Character(character) => character.gm_only,
        }
    }

    /// Full text to index
    pub fn content(&self) -> String {
        match self {
            Self::Page(page) => page.body.clone(),
            Self::Character(character) => format!(
                "{}\n\n{}\n\n{}",
                character.name, character.description, character.bio
            ),
        }
    }

    /// Everything except the content, flattened for storage next to each chunk
    pub fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        match self {
            Self::Page(page) => {
                metadata.insert("id".into(), json!(page.id));
                metadata.insert(TYPE_KEY.into(), json!(page.kind.as_str()));
                metadata.insert(TITLE_KEY.into(), json!(page.title));
                metadata.insert("source_url".into(), json!(page.source_url));
                metadata.insert(TAGS_KEY.into(), json!(page.tags));
                metadata.insert(GM_ONLY_KEY.into(), json!(page.gm_only));
                metadata.insert("created_at".into(), json!(page.created_at));
                metadata.insert("updated_at".into(), json!(page.updated_at));
            }
            Self::Character(character) => {
                metadata.insert("id".into(), json!(character.id));
                metadata.insert(TYPE_KEY.into(), json!(DocumentKind::Character.as_str()));
                metadata.insert(TITLE_KEY.into(), json!(character.name));
                metadata.insert("name".into(), json!(character.name));
                metadata.insert(
                    "is_player_character".into(),
                    json!(character.is_player_character),
                );
                metadata.insert("source_url".into(), json!(character.source_url));
                metadata.insert(TAGS_KEY.into(), json!(character.tags));
                metadata.insert(GM_ONLY_KEY.into(), json!(character.gm_only));
                metadata.insert("created_at".into(), json!(character.created_at));
                metadata.insert("updated_at".into(), json!(character.updated_at));
            }
        }
        metadata
    }
}

impl From<Page> for Document {
    fn from(page: Page) -> Self {
        Self::Page(page)
    }
}

impl From<Character> for Document {
    fn from(character: Character) -> Self {
        Self::Character(character)
    }
}

/// A chunk of a document as seen by the indexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Position within the parent document
    pub index: usize,
    /// Number of chunks the parent document produced
    pub total: usize,
}

/// The unit stored in the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPoint {
    /// Freshly generated, unrelated to the document id
    pub id: Uuid,
    /// Embedding of the chunk text
    pub vector: Vec<f32>,
    /// Chunk text, document metadata, `chunk_index` and `total_chunks`
    pub payload: Map<String, Value>,
}

impl IndexPoint {
    /// Build a point for one chunk of a document
    pub fn new(chunk: &Chunk, vector: Vec<f32>, metadata: &Map<String, Value>) -> Self {
        let mut payload = metadata.clone();
        payload.insert(CONTENT_KEY.into(), json!(chunk.text));
        payload.insert("chunk_index".into(), json!(chunk.index));
        payload.insert("total_chunks".into(), json!(chunk.total));

        Self {
            id: Uuid::new_v4(),
            vector,
            payload,
        }
    }

    /// Chunk text stored in the payload
    pub fn content(&self) -> Option<&str> {
        self.payload.get(CONTENT_KEY).and_then(Value::as_str)
    }
}
