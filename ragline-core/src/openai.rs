//! Embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Works with the OpenAI API as well as self-hosted servers that mimic it
//! (text-embeddings-inference, Ollama, vLLM, ...). Large batches are split
//! into requests of at most [`MAX_INPUTS_PER_REQUEST`] texts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Output size of [`DEFAULT_OPENAI_MODEL`].
const DEFAULT_DIMENSIONS: usize = 1536;

/// Upper bound on `input` entries the OpenAI API accepts in one call.
pub const MAX_INPUTS_PER_REQUEST: usize = 2048;

const PROVIDER: &str = "openai";

/// Error envelope shared by OpenAI-compatible APIs.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// The `error.message` of an OpenAI-style error body, or the raw body.
pub(crate) fn api_error_message(body: String) -> String {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body,
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Put `items` back into request order.
///
/// Servers may answer out of order, so the `index` field decides each
/// vector's slot. Items without one keep their response position.
fn in_request_order(items: Vec<EmbeddingItem>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if items.len() != expected {
        return Err(failure(format!("expected {expected} embeddings, got {}", items.len())));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, item) in items.into_iter().enumerate() {
        let slot = item.index.unwrap_or(position);
        match slots.get_mut(slot) {
            Some(entry @ None) => *entry = Some(item.embedding),
            Some(Some(_)) => return Err(failure(format!("duplicate embedding index {slot}"))),
            None => return Err(failure(format!("embedding index {slot} out of range"))),
        }
    }
    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| failure("response is missing an embedding".to_string())))
        .collect()
}

fn failure(message: String) -> RagError {
    RagError::Embedding { provider: PROVIDER.to_string(), message }
}

/// An [`EmbeddingProvider`] that calls `{base_url}/embeddings`.
pub struct OpenAIEmbeddingProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// Sent as `dimensions` so the server truncates (Matryoshka models).
    requested_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// A provider for [`DEFAULT_OPENAI_MODEL`] on the public OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] when `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Config("OpenAI API key must not be empty".to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            requested_dimensions: None,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the provider at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Ask the server for vectors of `dimensions` entries.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self.requested_dimensions = Some(dimensions);
        self
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions,
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                failure(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = api_error_message(response.text().await.unwrap_or_default());
            error!(provider = PROVIDER, %status, "embedding API error");
            return Err(failure(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("failed to parse response: {e}")))?;
        in_request_order(parsed.data, texts.len())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text]).await?;
        vectors.pop().ok_or_else(|| failure("API returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            debug!(
                provider = PROVIDER,
                model = %self.model,
                batch_size = batch.len(),
                "embedding batch"
            );
            vectors.extend(self.request(batch).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
