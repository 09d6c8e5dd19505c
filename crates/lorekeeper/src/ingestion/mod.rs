//! Document ingestion: chunking, embedding and indexing

mod chunker;
mod indexer;
mod pipeline;

pub use chunker::{chunk_text, TextChunker, DEFAULT_MAX_CHARS, DEFAULT_OVERLAP_CHARS};
pub use indexer::Indexer;
pub use pipeline::IngestPipeline;
