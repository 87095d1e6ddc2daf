//! The vector index: embedding, normalization and an explicit readiness state
//! on top of a [`VectorStore`] backend.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::RagConfig;
use crate::document::{Chunk, IndexEntry, RetrievedDocument};
use crate::embedding::{EmbeddingProvider, normalize};
use crate::error::{RagError, Result};
use crate::persistence::IndexMetadata;
use crate::vectorstore::VectorStore;

/// Lifecycle of a [`VectorIndex`].
///
/// `Uninitialized` becomes `Ready` after a successful build or load. A
/// rebuild that fails after the store was reset drops back to
/// `Uninitialized`, since the store may hold nothing or only part of the
/// new chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Nothing has been built or loaded yet.
    Uninitialized,
    /// The index can be searched.
    Ready,
}

/// Embeds chunks and queries and keeps them in a [`VectorStore`].
///
/// Every stored vector and every query vector is L2-normalized, so the inner
/// product the store computes is the cosine similarity.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create an uninitialized index.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store, state: RwLock::new(IndexState::Uninitialized) }
    }

    /// The embedding provider used for chunks and queries.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// The storage backend.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> IndexState {
        *self.state.read().await
    }

    /// Whether the index has been built or loaded.
    pub async fn is_ready(&self) -> bool {
        self.state().await == IndexState::Ready
    }

    async fn ensure_ready(&self) -> Result<()> {
        if self.is_ready().await { Ok(()) } else { Err(RagError::NotReady) }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        let expected = self.embedder.dimensions();
        if vector.len() == expected {
            Ok(())
        } else {
            Err(RagError::DimensionMismatch { expected, actual: vector.len() })
        }
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<IndexEntry>> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
            error!(error = %e, chunk_count = chunks.len(), "embedding failed");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding {
                provider: self.embedder.model_name().to_string(),
                message: format!("expected {} embeddings, got {}", chunks.len(), embeddings.len()),
            });
        }

        chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, mut embedding)| {
                self.check_dimension(&embedding)?;
                normalize(&mut embedding);
                Ok(IndexEntry { chunk: chunk.clone(), embedding })
            })
            .collect()
    }

    /// Replace the index contents with `chunks` and mark the index ready.
    ///
    /// Embedding happens before the store is touched, so an embedding
    /// failure leaves any previous contents in place. A store failure during
    /// the rewrite leaves the index uninitialized until the next successful
    /// build or load.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyInput`] if `chunks` is empty, or the
    /// embedding/store error that interrupted the build.
    pub async fn build(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Err(RagError::EmptyInput);
        }

        let entries = self.embed_chunks(chunks).await?;

        let mut state = self.state.write().await;
        if let Err(e) = self.rewrite_store(&entries).await {
            *state = IndexState::Uninitialized;
            warn!(error = %e, backend = self.store.backend(), "index rebuild failed");
            return Err(e);
        }
        *state = IndexState::Ready;

        info!(chunk_count = entries.len(), backend = self.store.backend(), "index built");
        Ok(())
    }

    async fn rewrite_store(&self, entries: &[IndexEntry]) -> Result<()> {
        self.store.reset(self.embedder.dimensions()).await?;
        self.store.upsert(entries).await
    }

    /// Append `chunks` to a ready index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] before a build or load.
    pub async fn insert(&self, chunks: &[Chunk]) -> Result<()> {
        self.ensure_ready().await?;
        if chunks.is_empty() {
            return Ok(());
        }

        let entries = self.embed_chunks(chunks).await?;
        let _guard = self.state.write().await;
        self.store.upsert(&entries).await?;

        info!(chunk_count = entries.len(), backend = self.store.backend(), "inserted chunks");
        Ok(())
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Scores are cosine similarities clamped to `[-1, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] before a build or load.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        let state = self.state.read().await;
        if *state != IndexState::Ready {
            return Err(RagError::NotReady);
        }

        let mut embedding = self.embedder.embed_query(query).await?;
        self.check_dimension(&embedding)?;
        normalize(&mut embedding);

        let mut results = self.store.search(&embedding, k).await?;
        for result in &mut results {
            result.score = result.score.clamp(-1.0, 1.0);
        }
        Ok(results)
    }

    /// Number of indexed chunks; zero while uninitialized.
    pub async fn len(&self) -> Result<usize> {
        if self.is_ready().await { self.store.len().await } else { Ok(0) }
    }

    /// Whether the index holds no chunks.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Indexed chunks; empty while uninitialized.
    pub async fn chunks(&self) -> Result<Vec<Chunk>> {
        if self.is_ready().await { self.store.chunks().await } else { Ok(Vec::new()) }
    }

    /// Whether `path` holds something [`load`](Self::load) can restore.
    pub async fn has_saved(&self, path: &Path) -> bool {
        self.store.has_saved_index(path).await
    }

    /// Persist the index and `config` under `path`. The state stays `Ready`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] before a build or load.
    pub async fn save(&self, path: &Path, config: &RagConfig) -> Result<()> {
        let state = self.state.read().await;
        if *state != IndexState::Ready {
            return Err(RagError::NotReady);
        }

        let metadata =
            IndexMetadata::new(self.embedder.model_name(), self.embedder.dimensions(), config);
        self.store.save(path, metadata).await?;
        info!(path = %path.display(), backend = self.store.backend(), "index saved");
        Ok(())
    }

    /// Restore a previously saved index and mark the index ready.
    ///
    /// Returns the saved metadata when the backend keeps it locally.
    pub async fn load(&self, path: &Path) -> Result<Option<IndexMetadata>> {
        let mut state = self.state.write().await;
        let metadata = self.store.load(path, self.embedder.dimensions()).await?;

        if let Some(meta) = &metadata {
            if meta.embedding_model != self.embedder.model_name() {
                warn!(
                    saved = %meta.embedding_model,
                    active = %self.embedder.model_name(),
                    "index was built with a different embedding model"
                );
            }
        }

        *state = IndexState::Ready;
        info!(path = %path.display(), backend = self.store.backend(), "index loaded");
        Ok(metadata)
    }
}
