//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], which
//! splits text by character count with a configurable overlap.

use crate::config::RagConfig;
use crate::document::Chunk;

/// A strategy for splitting document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split raw text into ordered chunk texts.
    ///
    /// Returns an empty `Vec` if `text` is empty.
    fn split(&self, text: &str) -> Vec<String>;

    /// Split a document into [`Chunk`]s tagged with `source`.
    ///
    /// Chunks are numbered from 0 in document order and carry the total
    /// chunk count of the document.
    fn chunk(&self, source: &str, text: &str) -> Vec<Chunk> {
        let pieces = self.split(text);
        let total = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_id, text)| Chunk {
                text,
                source: source.to_string(),
                chunk_id,
                total_chunks: Some(total),
            })
            .collect()
    }
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk `i` starts at character `i * (chunk_size - chunk_overlap)` and spans at
/// most `chunk_size` characters. Splitting stops with the first chunk that
/// reaches the end of the text. Each chunk is trimmed of surrounding
/// whitespace. Offsets count `char`s, so multi-byte text is never cut inside
/// a code point.
///
/// # Example
///
/// ```rust
/// use ragline_core::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(4, 1);
/// assert_eq!(chunker.split("abcdefghij"), vec!["abcd", "defg", "ghij"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Create a chunker from the chunking parameters of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Distance in characters between the starts of consecutive chunks.
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char start, plus the end of the text.
        let boundaries: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_len = boundaries.len() - 1;
        let step = self.step();

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < char_len {
            let end = (start + self.chunk_size).min(char_len);
            chunks.push(text[boundaries[start]..boundaries[end]].trim().to_string());
            if end >= char_len {
                break;
            }
            start += step;
        }

        chunks
    }
}
