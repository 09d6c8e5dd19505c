//! Paragraph-aware text chunking with character overlap

use crate::config::ChunkingConfig;

/// Default character budget per chunk
pub const DEFAULT_MAX_CHARS: usize = 800;
/// Default characters carried over from the previous chunk
pub const DEFAULT_OVERLAP_CHARS: usize = 150;

/// Text chunker with configurable size and overlap
///
/// Paragraphs (newline separated) are accumulated greedily until the budget
/// would be exceeded. Every chunk after the first starts with the tail of its
/// predecessor. A paragraph is never split, so a single oversized paragraph
/// becomes its own over-budget chunk. Lengths are counted in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    /// Target chunk size in characters
    max_chars: usize,
    /// Overlap between chunks in characters
    overlap_chars: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS, DEFAULT_OVERLAP_CHARS)
    }
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars,
        }
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.max_chars, config.overlap_chars)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Split text into ordered chunks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        let mut seed = String::new();

        for paragraph in text.split('\n').map(str::trim).filter(|p| !p.is_empty()) {
            let paragraph_len = paragraph.chars().count();

            if current_len + paragraph_len + 1 <= self.max_chars {
                if !current.is_empty() {
                    current.push('\n');
                    current_len += 1;
                }
                current.push_str(paragraph);
                current_len += paragraph_len;
                continue;
            }

            if !current.is_empty() {
                seed = self.overlap_tail(&current);
                chunks.push(std::mem::take(&mut current));
            }

            // Start new chunk with overlap
            current = if seed.is_empty() {
                paragraph.to_string()
            } else {
                format!("{}\n{}", seed, paragraph).trim().to_string()
            };
            current_len = current.chars().count();
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// Trailing `overlap_chars` characters of an emitted chunk
    fn overlap_tail(&self, chunk: &str) -> String {
        if self.overlap_chars == 0 {
            return String::new();
        }

        let len = chunk.chars().count();
        if len <= self.overlap_chars {
            return chunk.to_string();
        }

        chunk.chars().skip(len - self.overlap_chars).collect()
    }
}

/// Chunk text with explicit parameters
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    TextChunker::new(max_chars, overlap_chars).chunk(text)
}
