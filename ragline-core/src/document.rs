//! Data types for chunks, index entries and retrieval results.

use serde::{Deserialize, Serialize};

/// A bounded substring of a source document, the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The (whitespace-trimmed) text content of the chunk.
    pub text: String,
    /// Identifier of the originating document, usually its path.
    pub source: String,
    /// Position of this chunk within its document, starting at 0.
    pub chunk_id: usize,
    /// Number of chunks the document was split into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
}

impl Chunk {
    /// Create a chunk without a known total count.
    pub fn new(text: impl Into<String>, source: impl Into<String>, chunk_id: usize) -> Self {
        Self { text: text.into(), source: source.into(), chunk_id, total_chunks: None }
    }
}

/// A [`Chunk`] paired with its unit-length embedding, as held by a vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The normalized embedding of the chunk text.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Chunk`] annotated with its similarity to the query.
///
/// Serializes flat, i.e. the chunk fields sit next to `score`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    /// The retrieved chunk.
    #[serde(flatten)]
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Summary of what an index currently holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentStats {
    /// Number of indexed chunks.
    pub total_chunks: usize,
    /// Distinct chunk sources, sorted.
    pub sources: Vec<String>,
}

impl DocumentStats {
    /// Summarize a set of chunks.
    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        let mut total_chunks = 0;
        let mut sources = std::collections::BTreeSet::new();
        for chunk in chunks {
            total_chunks += 1;
            sources.insert(chunk.source.clone());
        }
        Self { total_chunks, sources: sources.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieved_document_serializes_flat() {
        let doc = RetrievedDocument {
            chunk: Chunk { total_chunks: Some(2), ..Chunk::new("cats", "a.txt", 1) },
            score: 0.5,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["text"], "cats");
        assert_eq!(value["source"], "a.txt");
        assert_eq!(value["chunk_id"], 1);
        assert_eq!(value["total_chunks"], 2);
        assert_eq!(value["score"], 0.5);
    }

    #[test]
    fn stats_deduplicate_sources() {
        let chunks =
            [Chunk::new("a", "x.txt", 0), Chunk::new("b", "x.txt", 1), Chunk::new("c", "w.txt", 0)];
        let stats = DocumentStats::from_chunks(&chunks);
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.sources, vec!["w.txt".to_string(), "x.txt".to_string()]);
    }
}
