//! In-memory vector store using exact inner-product search.
//!
//! This module provides [`InMemoryVectorStore`], a flat list of entries
//! protected by a `tokio::sync::RwLock`. Search is a full scan, which is
//! plenty for the document counts a single process indexes. The store can be
//! saved to and restored from disk, see [`persistence`](crate::persistence).

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, IndexEntry, RetrievedDocument};
use crate::embedding::dot;
use crate::error::{RagError, Result};
use crate::persistence::{self, IndexMetadata};
use crate::vectorstore::VectorStore;

#[derive(Debug, Default)]
struct Inner {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// An in-memory vector store scored by inner product of unit vectors.
///
/// Entries keep their insertion order, which also breaks score ties.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_core::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.reset(384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &'static str {
        "in-memory"
    }

    async fn reset(&self, dimensions: usize) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.dimensions = dimensions;
        inner.entries.clear();
        Ok(())
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        let mut inner = self.inner.write().await;
        let dimensions = inner.dimensions;
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }
        inner.entries.extend_from_slice(entries);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedDocument>> {
        let inner = self.inner.read().await;
        if embedding.len() != inner.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: inner.dimensions,
                actual: embedding.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = inner
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, dot(&e.embedding, embedding)))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| RetrievedDocument { chunk: inner.entries[i].chunk.clone(), score })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.entries.len())
    }

    async fn chunks(&self) -> Result<Vec<Chunk>> {
        Ok(self.inner.read().await.entries.iter().map(|e| e.chunk.clone()).collect())
    }

    async fn save(&self, path: &Path, metadata: IndexMetadata) -> Result<()> {
        let inner = self.inner.read().await;
        persistence::save_index(path, &inner.entries, metadata).await
    }

    async fn load(&self, path: &Path, dimensions: usize) -> Result<Option<IndexMetadata>> {
        let (entries, metadata) = persistence::load_index(path, dimensions).await?;
        let mut inner = self.inner.write().await;
        inner.dimensions = dimensions;
        inner.entries = entries;
        Ok(Some(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry { chunk: Chunk::new(text, "t.txt", 0), embedding }
    }

    #[tokio::test]
    async fn search_orders_by_descending_score() {
        let store = InMemoryVectorStore::new();
        store.reset(2).await.unwrap();
        store
            .upsert(&[
                entry("x", vec![1.0, 0.0]),
                entry("y", vec![0.0, 1.0]),
                entry("xy", vec![0.6, 0.8]),
            ])
            .await
            .unwrap();

        let results = store.search(&[0.0, 1.0], 3).await.unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["y", "xy", "x"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!((results[1].score - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = InMemoryVectorStore::new();
        store.reset(2).await.unwrap();
        store
            .upsert(&[entry("first", vec![1.0, 0.0]), entry("second", vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].chunk.text, "first");
        assert_eq!(results[1].chunk.text, "second");
    }

    #[tokio::test]
    async fn rejects_wrong_dimension() {
        let store = InMemoryVectorStore::new();
        store.reset(3).await.unwrap();
        let err = store.upsert(&[entry("x", vec![1.0, 0.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
        assert!(store.search(&[1.0], 1).await.is_err());
    }

    #[tokio::test]
    async fn reset_clears_entries() {
        let store = InMemoryVectorStore::new();
        store.reset(2).await.unwrap();
        store.upsert(&[entry("x", vec![1.0, 0.0])]).await.unwrap();
        store.reset(2).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
