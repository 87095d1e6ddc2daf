//! Retrieval-augmented generation for plain-text document collections.
//!
//! This crate provides:
//! - Character-window chunking with overlap
//! - Embedding providers (local ONNX models, OpenAI-compatible APIs, feature hashing)
//! - A cosine-similarity vector index over an in-memory or Qdrant backend
//! - Crash-safe on-disk persistence for the in-memory index
//! - Grounded answer generation through an OpenAI-compatible chat API
//! - [`RagPipeline`], which ties the pieces together
//!
//! # Feature flags
//!
//! - `local`: [`local::LocalEmbeddingProvider`] via fastembed
//! - `qdrant`: [`qdrant::QdrantVectorStore`]

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod hashing;
pub mod index;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "local")]
pub mod local;
pub mod openai;
pub mod persistence;
pub mod pipeline;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod retriever;
pub mod settings;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{GenerationConfig, RagConfig, RagConfigBuilder};
pub use document::{Chunk, DocumentStats, IndexEntry, RetrievedDocument};
pub use embedding::EmbeddingProvider;
pub use error::{GenerationError, RagError, Result};
pub use generator::{
    ChatMessage, ChatModel, GENERATION_DISABLED, GeneratedAnswer, Generator, OpenAiCompatibleChat,
};
pub use hashing::HashingEmbeddingProvider;
pub use index::{IndexState, VectorIndex};
pub use inmemory::InMemoryVectorStore;
pub use openai::OpenAIEmbeddingProvider;
pub use persistence::IndexMetadata;
pub use pipeline::{IndexOrigin, QueryResult, RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use settings::Settings;
pub use vectorstore::VectorStore;
