//! Vector store trait for storing and searching normalized embeddings.

use std::path::Path;

use async_trait::async_trait;

use crate::document::{Chunk, IndexEntry, RetrievedDocument};
use crate::error::{RagError, Result};
use crate::persistence::{self, IndexMetadata};

/// A storage backend for unit-length embeddings with similarity search.
///
/// Backends are interchangeable behind [`VectorIndex`](crate::VectorIndex),
/// which takes care of embedding and normalization. All scores are cosine
/// similarities in `[-1, 1]`.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_core::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&entries).await?;
/// let results = store.search(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in logs and errors.
    fn backend(&self) -> &'static str;

    /// Remove every entry and prepare for vectors of `dimensions` components.
    async fn reset(&self, dimensions: usize) -> Result<()>;

    /// Append entries. Embeddings are already normalized.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Return the `top_k` entries most similar to `embedding`.
    ///
    /// Results are ordered by descending score.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedDocument>>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    /// All stored chunks, in insertion order where the backend preserves it.
    async fn chunks(&self) -> Result<Vec<Chunk>>;

    /// Persist the store contents together with `metadata` under `path`.
    ///
    /// The default implementation reports that the backend has no local
    /// persistence.
    async fn save(&self, path: &Path, metadata: IndexMetadata) -> Result<()> {
        let _ = (path, metadata);
        Err(RagError::VectorStore {
            backend: self.backend().to_string(),
            message: "saving to disk is not supported by this backend".to_string(),
        })
    }

    /// Whether a saved index that [`load`](Self::load) can restore exists.
    async fn has_saved_index(&self, path: &Path) -> bool {
        persistence::index_exists(path)
    }

    /// Restore the store from `path`, returning the saved metadata if the
    /// backend keeps any locally.
    async fn load(&self, path: &Path, dimensions: usize) -> Result<Option<IndexMetadata>> {
        let _ = (path, dimensions);
        Err(RagError::VectorStore {
            backend: self.backend().to_string(),
            message: "loading from disk is not supported by this backend".to_string(),
        })
    }
}
