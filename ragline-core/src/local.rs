//! Local sentence embeddings via [fastembed](https://docs.rs/fastembed) (ONNX runtime).
//!
//! This module is only available when the `local` feature is enabled. Models
//! are downloaded from Hugging Face on first use and cached.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default local model, matching the reference deployment.
pub const DEFAULT_LOCAL_MODEL: &str = "BAAI/bge-base-en-v1.5";

/// Resolve a Hugging Face model name to a fastembed model and its dimension.
fn resolve_model(name: &str) -> Option<(EmbeddingModel, usize)> {
    match name {
        "BAAI/bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
        "BAAI/bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
        "BAAI/bge-large-en-v1.5" => Some((EmbeddingModel::BGELargeENV15, 1024)),
        "sentence-transformers/all-MiniLM-L6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
        _ => None,
    }
}

fn embedding_error(e: impl std::fmt::Display) -> RagError {
    RagError::Embedding { provider: "fastembed".into(), message: e.to_string() }
}

/// An [`EmbeddingProvider`] running a BGE-family model in-process.
///
/// Inference is CPU-bound, so every call runs on tokio's blocking pool.
pub struct LocalEmbeddingProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimensions: usize,
}

impl LocalEmbeddingProvider {
    /// Load the named model, downloading it if it is not cached yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] for an unsupported model name and
    /// [`RagError::Embedding`] if the model cannot be loaded.
    pub fn new(model_name: &str) -> Result<Self> {
        let (model, dimensions) = resolve_model(model_name).ok_or_else(|| {
            RagError::Config(format!("unsupported local embedding model '{model_name}'"))
        })?;

        info!(model = model_name, "loading embedding model");
        let options = InitOptions::new(model).with_show_download_progress(true);
        let model = TextEmbedding::try_new(options).map_err(embedding_error)?;
        info!(model = model_name, dimensions, "embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let guard = model.lock().map_err(|_| embedding_error("model lock poisoned"))?;
            guard.embed(texts, None).map_err(embedding_error)
        })
        .await
        .map_err(embedding_error)?
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| embedding_error("model returned no embeddings"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = "fastembed", batch_size = texts.len(), "embedding batch");
        self.run(texts.iter().map(|t| t.to_string()).collect()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
