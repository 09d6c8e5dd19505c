//! Content source trait for fetching campaign documents

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Character, Page};

/// Read access to one campaign's wiki pages and characters
///
/// Listings may be abridged: character listings carry no `description` or
/// `bio`, so callers needing full text must fetch characters one by one.
///
/// Implementations:
/// - `ObsidianPortalClient`: Obsidian Portal REST API
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All wiki pages and posts of the campaign, with bodies
    async fn list_wiki_pages(&self) -> Result<Vec<Page>>;

    /// A single wiki page or post
    async fn get_wiki_page(&self, page_id: &str) -> Result<Page>;

    /// Character summaries of the campaign
    async fn list_characters(&self) -> Result<Vec<Character>>;

    /// A single character with description and bio
    async fn get_character(&self, character_id: &str) -> Result<Character>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Accept an id only if it is a single opaque token
///
/// Record ids become one URL path segment, so only ASCII alphanumerics, `-`
/// and `_` are allowed.
pub fn check_record_id(id: &str) -> Result<&str> {
    let plain = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        Ok(id)
    } else {
        Err(Error::invalid_request(format!("'{}' is not a valid record id", id)))
    }
}
