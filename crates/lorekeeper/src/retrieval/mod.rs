//! Retrieval of context snippets from the vector index

mod search;

pub use search::{RetrievalResult, Retriever, SearchFilters, Snippet, UNTITLED};
