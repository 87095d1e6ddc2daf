//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! The whole index lives in one Qdrant collection with cosine distance. Points
//! get sequential numeric ids so that scrolling returns chunks in insertion
//! order. Because the data is already durable on the server, `save` writes
//! nothing and `load` attaches to the existing collection.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline_core::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::connect("http://localhost:6334", "ragline", None)?;
//! store.reset(768).await?;
//! store.upsert(&entries).await?;
//! let results = store.search(&query_embedding, 5).await?;
//! ```

use std::path::Path;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CollectionInfo, CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder, vectors_config,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::document::{Chunk, IndexEntry, RetrievedDocument};
use crate::error::{RagError, Result};
use crate::persistence::IndexMetadata;
use crate::vectorstore::VectorStore;

/// Page size used when scrolling through the collection.
const SCROLL_PAGE: u32 = 256;

/// A [`VectorStore`] backed by a single [Qdrant](https://qdrant.tech/) collection.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    /// Open a client for the server at `url`, working on `collection`.
    ///
    /// The connection is established lazily and reused for every call.
    pub fn connect(
        url: &str,
        collection: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(Self::map_err)?;
        Ok(Self { client, collection: collection.into() })
    }

    /// Create a store from an existing client.
    pub fn from_client(client: Qdrant, collection: impl Into<String>) -> Self {
        Self { client, collection: collection.into() }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStore { backend: "qdrant".to_string(), message: e.to_string() }
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn extract_usize(value: &QdrantValue) -> Option<usize> {
        match &value.kind {
            Some(Kind::IntegerValue(n)) => usize::try_from(*n).ok(),
            Some(Kind::DoubleValue(n)) if *n >= 0.0 => Some(*n as usize),
            _ => None,
        }
    }

    /// Size of the single unnamed vector a collection was created with.
    fn vector_size(info: &CollectionInfo) -> Option<usize> {
        let vectors = info.config.as_ref()?.params.as_ref()?.vectors_config.as_ref()?;
        match vectors.config.as_ref()? {
            vectors_config::Config::Params(params) => usize::try_from(params.size).ok(),
            vectors_config::Config::ParamsMap(_) => None,
        }
    }

    /// Reject a collection whose vectors do not have `dimensions` entries.
    fn check_dimensions(&self, info: &CollectionInfo, dimensions: usize) -> Result<()> {
        match Self::vector_size(info) {
            Some(actual) if actual == dimensions => Ok(()),
            Some(actual) => Err(RagError::DimensionMismatch { expected: dimensions, actual }),
            None => Err(RagError::VectorStore {
                backend: "qdrant".to_string(),
                message: format!("collection '{}' has no single unnamed vector", self.collection),
            }),
        }
    }

    fn chunk_from_payload(payload: &std::collections::HashMap<String, QdrantValue>) -> Chunk {
        Chunk {
            text: payload.get("text").and_then(Self::extract_string).unwrap_or_default(),
            source: payload.get("source").and_then(Self::extract_string).unwrap_or_default(),
            chunk_id: payload.get("chunk_id").and_then(Self::extract_usize).unwrap_or_default(),
            total_chunks: payload.get("total_chunks").and_then(Self::extract_usize),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn reset(&self, dimensions: usize) -> Result<()> {
        if self.client.collection_exists(&self.collection).await.map_err(Self::map_err)? {
            self.client.delete_collection(&self.collection).await.map_err(Self::map_err)?;
            debug!(collection = %self.collection, "dropped qdrant collection");
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        info!(collection = %self.collection, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let first_id = self.len().await? as u64;
        let points = entries
            .iter()
            .enumerate()
            .map(|(offset, entry)| {
                let chunk = &entry.chunk;
                let payload = Payload::try_from(json!({
                    "text": chunk.text,
                    "source": chunk.source,
                    "chunk_id": chunk.chunk_id,
                    "total_chunks": chunk.total_chunks,
                }))
                .map_err(Self::map_err)?;
                Ok(PointStruct::new(first_id + offset as u64, entry.embedding.clone(), payload))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection = %self.collection, count = entries.len(), "upserted chunks to qdrant");
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedDocument>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        Ok(response
            .result
            .into_iter()
            .map(|scored| RetrievedDocument {
                chunk: Self::chunk_from_payload(&scored.payload),
                score: scored.score,
            })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(Self::map_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or_default())
    }

    async fn chunks(&self) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut offset = None;
        loop {
            let mut request =
                ScrollPointsBuilder::new(&self.collection).limit(SCROLL_PAGE).with_payload(true);
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }
            let page = self.client.scroll(request).await.map_err(Self::map_err)?;
            chunks.extend(page.result.iter().map(|point| Self::chunk_from_payload(&point.payload)));
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(chunks)
    }

    async fn save(&self, _path: &Path, _metadata: IndexMetadata) -> Result<()> {
        debug!(collection = %self.collection, "qdrant data is stored remotely, nothing to save");
        Ok(())
    }

    async fn has_saved_index(&self, _path: &Path) -> bool {
        match self.client.collection_exists(&self.collection).await {
            Ok(true) => self.len().await.map(|n| n > 0).unwrap_or(false),
            Ok(false) => false,
            Err(e) => {
                warn!(
                    collection = %self.collection,
                    error = %e,
                    "failed to check qdrant collection"
                );
                false
            }
        }
    }

    async fn load(&self, _path: &Path, dimensions: usize) -> Result<Option<IndexMetadata>> {
        if !self.client.collection_exists(&self.collection).await.map_err(Self::map_err)? {
            return Err(RagError::VectorStore {
                backend: "qdrant".to_string(),
                message: format!("collection '{}' does not exist", self.collection),
            });
        }

        let response =
            self.client.collection_info(&self.collection).await.map_err(Self::map_err)?;
        let info = response.result.unwrap_or_default();
        self.check_dimensions(&info, dimensions)?;

        info!(collection = %self.collection, dimensions, "attached to existing qdrant collection");
        Ok(None)
    }
}
