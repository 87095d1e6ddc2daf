//! Environment-driven settings shared by the server and the CLI.
//!
//! [`Settings::from_env`] reads `.env` (via `dotenvy`) and the process
//! environment, then [`Settings::pipeline`] assembles the embedder, vector
//! store and generator they select.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{GenerationConfig, RagConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::Generator;
use crate::hashing::{DEFAULT_HASHING_DIMENSIONS, HashingEmbeddingProvider};
use crate::inmemory::InMemoryVectorStore;
use crate::openai::OpenAIEmbeddingProvider;
use crate::pipeline::RagPipeline;
use crate::vectorstore::VectorStore;

/// Default base name of the saved index.
pub const DEFAULT_INDEX_PATH: &str = "rag_index";

/// Default directory scanned for `*.txt` documents.
pub const DEFAULT_DOCUMENTS_DIR: &str = "documents";

/// Default Qdrant collection name.
pub const DEFAULT_QDRANT_COLLECTION: &str = "ragline";

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// A local ONNX model through fastembed.
    Local,
    /// An OpenAI-compatible embeddings API.
    OpenAi,
    /// Deterministic feature hashing, no model required.
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "fastembed" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            "hashing" | "hash" => Ok(Self::Hashing),
            other => Err(RagError::Config(format!(
                "unknown EMBEDDING_PROVIDER '{other}' (expected local, openai or hashing)"
            ))),
        }
    }
}

/// Embedding provider selection and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSettings {
    /// Selected backend.
    pub backend: EmbeddingBackend,
    /// Model override; each backend has its own default.
    pub model: Option<String>,
    /// Output dimension override.
    pub dimensions: Option<usize>,
    /// Key for the OpenAI-compatible API.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: Option<String>,
}

/// Vector store selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    /// In-process store saved to local files.
    Memory,
    /// A Qdrant collection.
    Qdrant {
        /// gRPC endpoint, e.g. `http://localhost:6334`.
        url: String,
        /// Collection holding the index.
        collection: String,
        /// Optional API key.
        api_key: Option<String>,
    },
}

/// Everything the binaries need to assemble a [`RagPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Chunking and retrieval parameters.
    pub rag: RagConfig,
    /// Chat-completion parameters.
    pub generation: GenerationConfig,
    /// Embedding provider selection.
    pub embedding: EmbeddingSettings,
    /// Vector store selection.
    pub store: StoreSettings,
    /// Base name of the saved index.
    pub index_path: PathBuf,
    /// Directory of `*.txt` documents to index.
    pub documents_dir: PathBuf,
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| RagError::Config(format!("invalid value for {name} ('{raw}'): {e}")))
        })
        .transpose()
}

impl Settings {
    /// Read settings from `.env` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] for unparseable numbers, unknown backend
    /// names, `RAG_BACKEND=qdrant` without `QDRANT_URL`, or inconsistent
    /// chunking parameters.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let defaults = RagConfig::default();
        let rag = RagConfig {
            chunk_size: parse_var("CHUNK_SIZE", var("CHUNK_SIZE"))?.unwrap_or(defaults.chunk_size),
            chunk_overlap: parse_var("CHUNK_OVERLAP", var("CHUNK_OVERLAP"))?
                .unwrap_or(defaults.chunk_overlap),
            top_k: parse_var("TOP_K", var("TOP_K"))?.unwrap_or(defaults.top_k),
        };
        rag.validate()?;

        let mut generation =
            GenerationConfig { api_key: var("GROQ_API_KEY"), ..GenerationConfig::default() };
        if let Some(model) = var("GROQ_MODEL") {
            generation.model = model;
        }
        if let Some(base_url) = var("GROQ_BASE_URL") {
            generation.base_url = base_url;
        }
        let temperature = parse_var("GENERATION_TEMPERATURE", var("GENERATION_TEMPERATURE"))?;
        if let Some(temperature) = temperature {
            generation.temperature = temperature;
        }
        let max_tokens = parse_var("GENERATION_MAX_TOKENS", var("GENERATION_MAX_TOKENS"))?;
        if let Some(max_tokens) = max_tokens {
            generation.max_tokens = max_tokens;
        }
        let timeout = parse_var::<u64>("GENERATION_TIMEOUT_SECS", var("GENERATION_TIMEOUT_SECS"))?;
        if let Some(secs) = timeout {
            generation.timeout = Duration::from_secs(secs);
        }

        let backend = match var("EMBEDDING_PROVIDER") {
            Some(name) => name.parse()?,
            None if cfg!(feature = "local") => EmbeddingBackend::Local,
            None => EmbeddingBackend::Hashing,
        };
        let embedding = EmbeddingSettings {
            backend,
            model: var("EMBEDDING_MODEL"),
            dimensions: parse_var("EMBEDDING_DIMENSIONS", var("EMBEDDING_DIMENSIONS"))?,
            api_key: var("OPENAI_API_KEY"),
            base_url: var("OPENAI_BASE_URL"),
        };

        let store = match var("RAG_BACKEND").map(|b| b.to_ascii_lowercase()).as_deref() {
            None | Some("memory") | Some("in-memory") | Some("faiss") => StoreSettings::Memory,
            Some("qdrant") => StoreSettings::Qdrant {
                url: var("QDRANT_URL").ok_or_else(|| {
                    RagError::Config("QDRANT_URL must be set when RAG_BACKEND=qdrant".to_string())
                })?,
                collection: var("QDRANT_COLLECTION")
                    .unwrap_or_else(|| DEFAULT_QDRANT_COLLECTION.to_string()),
                api_key: var("QDRANT_API_KEY"),
            },
            Some(other) => {
                return Err(RagError::Config(format!(
                    "unknown RAG_BACKEND '{other}' (expected memory or qdrant)"
                )));
            }
        };

        Ok(Self {
            rag,
            generation,
            embedding,
            store,
            index_path: var("INDEX_PATH").unwrap_or_else(|| DEFAULT_INDEX_PATH.to_string()).into(),
            documents_dir: var("DOCUMENTS_DIR")
                .unwrap_or_else(|| DEFAULT_DOCUMENTS_DIR.to_string())
                .into(),
        })
    }

    /// Construct the selected embedding provider.
    ///
    /// Loading a local model may download it on first use.
    pub fn embedding_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let settings = &self.embedding;
        let provider: Arc<dyn EmbeddingProvider> = match settings.backend {
            EmbeddingBackend::Hashing => Arc::new(HashingEmbeddingProvider::new(
                settings.dimensions.unwrap_or(DEFAULT_HASHING_DIMENSIONS),
            )),
            EmbeddingBackend::OpenAi => {
                let api_key = settings.api_key.clone().ok_or_else(|| {
                    RagError::Config(
                        "OPENAI_API_KEY must be set when EMBEDDING_PROVIDER=openai".to_string(),
                    )
                })?;
                let mut provider = OpenAIEmbeddingProvider::new(api_key)?;
                if let Some(model) = &settings.model {
                    provider = provider.with_model(model);
                }
                if let Some(base_url) = &settings.base_url {
                    provider = provider.with_base_url(base_url);
                }
                if let Some(dimensions) = settings.dimensions {
                    provider = provider.with_dimensions(dimensions);
                }
                Arc::new(provider)
            }
            #[cfg(feature = "local")]
            EmbeddingBackend::Local => {
                let model = settings.model.as_deref().unwrap_or(crate::local::DEFAULT_LOCAL_MODEL);
                Arc::new(crate::local::LocalEmbeddingProvider::new(model)?)
            }
            #[cfg(not(feature = "local"))]
            EmbeddingBackend::Local => {
                return Err(RagError::Config(
                    "EMBEDDING_PROVIDER=local requires the `local` feature".to_string(),
                ));
            }
        };

        info!(
            model = provider.model_name(),
            dimensions = provider.dimensions(),
            "embedding provider ready"
        );
        Ok(provider)
    }

    /// Construct the selected vector store.
    pub fn vector_store(&self) -> Result<Arc<dyn VectorStore>> {
        match &self.store {
            StoreSettings::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
            #[cfg(feature = "qdrant")]
            StoreSettings::Qdrant { url, collection, api_key } => {
                info!(url = %url, collection = %collection, "using qdrant vector store");
                let store = crate::qdrant::QdrantVectorStore::connect(
                    url,
                    collection.clone(),
                    api_key.clone(),
                )?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "qdrant"))]
            StoreSettings::Qdrant { .. } => {
                Err(RagError::Config(
                    "RAG_BACKEND=qdrant requires the `qdrant` feature".to_string(),
                ))
            }
        }
    }

    /// Assemble a pipeline from these settings.
    pub fn pipeline(&self) -> Result<RagPipeline> {
        RagPipeline::builder()
            .config(self.rag)
            .embedding_provider(self.embedding_provider()?)
            .vector_store(self.vector_store()?)
            .generator(Generator::from_config(&self.generation)?)
            .build()
    }
}
