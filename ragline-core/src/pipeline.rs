//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-query workflow by
//! composing a [`Chunker`], a [`VectorIndex`] (an [`EmbeddingProvider`] over a
//! [`VectorStore`]) and a [`Generator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline_core::{HashingEmbeddingProvider, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .build()?;
//!
//! let chunks = pipeline.load_documents(&["documents/crops.txt"]).await?;
//! pipeline.build_index(&chunks).await?;
//! let result = pipeline.query("What is crop rotation?").await?;
//! println!("{}", result.answer);
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, DocumentStats, RetrievedDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::{GeneratedAnswer, Generator};
use crate::index::VectorIndex;
use crate::inmemory::InMemoryVectorStore;
use crate::loader;
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// The answer to one question together with the context it was based on.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// The question as asked.
    pub question: String,
    /// The generated answer, or the reason there is none.
    pub answer: GeneratedAnswer,
    /// Retrieved chunks, best first.
    pub retrieved_documents: Vec<RetrievedDocument>,
}

/// How [`RagPipeline::open_or_build`] obtained its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// A saved index was loaded.
    Loaded,
    /// The index was built from the documents directory and saved.
    Built {
        /// Number of chunks indexed.
        chunk_count: usize,
    },
    /// Neither a saved index nor any documents were found.
    Missing,
}

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (load → chunk → embed → store) and query
/// execution (embed → search → generate). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    chunker_from_config: bool,
    index: Arc<VectorIndex>,
    retriever: Retriever,
    generator: Generator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Return a reference to the answer generator.
    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Read and chunk the given text files.
    ///
    /// Missing files are logged and skipped.
    pub async fn load_documents<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<Chunk>> {
        loader::load_documents(self.chunker.as_ref(), paths).await
    }

    /// Chunk in-memory `text` attributed to `source`.
    pub fn chunk_text(&self, source: &str, text: &str) -> Vec<Chunk> {
        self.chunker.chunk(source, text)
    }

    /// Replace the index contents with `chunks`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyInput`] if `chunks` is empty, or the
    /// embedding/store error that interrupted the build.
    pub async fn build_index(&self, chunks: &[Chunk]) -> Result<()> {
        self.index.build(chunks).await.map_err(|e| {
            error!(chunk_count = chunks.len(), error = %e, "failed to build index");
            e
        })
    }

    /// Add `chunks` to a ready index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] before a build or load.
    pub async fn insert(&self, chunks: &[Chunk]) -> Result<()> {
        self.index.insert(chunks).await
    }

    /// Return the chunks most relevant to `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] before a build or load.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        self.retriever.retrieve(query).await
    }

    /// Answer `query` from `context`.
    pub async fn generate_answer(
        &self,
        query: &str,
        context: &[RetrievedDocument],
    ) -> GeneratedAnswer {
        self.generator.generate(query, context).await
    }

    /// Retrieve context for `question` and generate an answer from it.
    ///
    /// # Errors
    ///
    /// Fails only if retrieval fails; generation problems are reported in
    /// [`QueryResult::answer`].
    pub async fn query(&self, question: &str) -> Result<QueryResult> {
        let retrieved_documents = self.retrieve(question).await.map_err(|e| {
            error!(error = %e, "retrieval failed during query");
            e
        })?;
        let answer = self.generate_answer(question, &retrieved_documents).await;

        info!(result_count = retrieved_documents.len(), "query completed");
        Ok(QueryResult { question: question.to_string(), answer, retrieved_documents })
    }

    /// Persist the index and the current configuration under `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] before a build or load.
    pub async fn save_index(&self, path: impl AsRef<Path>) -> Result<()> {
        self.index.save(path.as_ref(), &self.config).await
    }

    /// Restore an index saved under `path`.
    ///
    /// Chunking and retrieval settings recorded with the index replace the
    /// current ones.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the files are missing and
    /// [`RagError::Persistence`] or [`RagError::DimensionMismatch`] if they do
    /// not fit the configured embedder.
    pub async fn load_index(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let Some(metadata) = self.index.load(path.as_ref()).await? else {
            return Ok(());
        };

        let saved = metadata.rag_config();
        if let Err(e) = saved.validate() {
            warn!(error = %e, "saved index carries invalid settings, keeping current ones");
            return Ok(());
        }
        if saved != self.config {
            info!(
                chunk_size = saved.chunk_size,
                chunk_overlap = saved.chunk_overlap,
                top_k = saved.top_k,
                "using settings from saved index"
            );
        }

        self.config = saved;
        self.retriever.set_top_k(saved.top_k);
        if self.chunker_from_config {
            self.chunker = Arc::new(FixedSizeChunker::from_config(&saved));
        }
        Ok(())
    }

    /// Load the index saved under `index_path`, or build one from the `*.txt`
    /// files in `documents_dir` and save it.
    ///
    /// Returns [`IndexOrigin::Missing`] and leaves the index uninitialized if
    /// neither exists.
    pub async fn open_or_build(
        &mut self,
        index_path: impl AsRef<Path>,
        documents_dir: impl AsRef<Path>,
    ) -> Result<IndexOrigin> {
        let index_path = index_path.as_ref();
        if self.index.has_saved(index_path).await {
            self.load_index(index_path).await?;
            return Ok(IndexOrigin::Loaded);
        }

        let files = loader::text_files_in(documents_dir.as_ref()).await?;
        if files.is_empty() {
            return Ok(IndexOrigin::Missing);
        }

        let chunks = self.load_documents(&files).await?;
        if chunks.is_empty() {
            return Ok(IndexOrigin::Missing);
        }
        self.build_index(&chunks).await?;
        self.save_index(index_path).await?;
        Ok(IndexOrigin::Built { chunk_count: chunks.len() })
    }

    /// Whether the index has been built or loaded.
    pub async fn is_ready(&self) -> bool {
        self.index.is_ready().await
    }

    /// Chunk count and distinct sources of the indexed documents.
    pub async fn document_stats(&self) -> Result<DocumentStats> {
        let chunks = self.index.chunks().await?;
        Ok(DocumentStats::from_chunks(&chunks))
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// Only the embedding provider is required. The vector store defaults to
/// [`InMemoryVectorStore`], the chunker to a [`FixedSizeChunker`] derived from
/// the config, and the generator to [`Generator::disabled`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))       // optional
///     .generator(Generator::new(chat))     // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    generator: Option<Generator>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set a custom document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Generator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the embedding provider is missing or
    /// the configuration is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store =
            self.vector_store.unwrap_or_else(|| Arc::new(InMemoryVectorStore::new()));

        let chunker_from_config = self.chunker.is_none();
        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(FixedSizeChunker::from_config(&config)));

        let index = Arc::new(VectorIndex::new(embedding_provider, vector_store));
        let retriever = Retriever::new(index.clone(), config.top_k);

        Ok(RagPipeline {
            config,
            chunker,
            chunker_from_config,
            index,
            retriever,
            generator: self.generator.unwrap_or_default(),
        })
    }
}
