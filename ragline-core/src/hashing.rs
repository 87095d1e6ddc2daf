//! Deterministic feature-hashing embeddings.
//!
//! [`HashingEmbeddingProvider`] needs no model download and no network. Each
//! lowercase alphanumeric token is hashed into one of `dimensions` buckets with
//! a hash-derived sign, so texts that share words get a positive cosine
//! similarity. It is useful offline, in tests, and for demos; retrieval
//! quality is lexical only.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// Default number of hash buckets.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 384;

/// An [`EmbeddingProvider`] based on the hashing trick over word tokens.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
    model_name: String,
}

impl HashingEmbeddingProvider {
    /// Create a provider producing vectors with `dimensions` components.
    ///
    /// A dimension of zero is bumped to one.
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self { dimensions, model_name: format!("feature-hashing-{dimensions}") }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

/// 64-bit FNV-1a; stable across platforms and releases, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{dot, normalize};

    fn unit(provider: &HashingEmbeddingProvider, text: &str) -> Vec<f32> {
        let mut v = provider.embed_sync(text);
        normalize(&mut v);
        v
    }

    #[test]
    fn embeddings_are_deterministic_and_sized() {
        let provider = HashingEmbeddingProvider::new(64);
        let a = provider.embed_sync("Cats are mammals");
        assert_eq!(a.len(), 64);
        assert_eq!(a, provider.embed_sync("cats ARE mammals!"));
    }

    #[test]
    fn shared_words_score_higher_than_disjoint_text() {
        let provider = HashingEmbeddingProvider::default();
        let query = unit(&provider, "mammals");
        let related = unit(&provider, "cats are mammals");
        let unrelated = unit(&provider, "quantum chromodynamics");
        assert!(dot(&query, &related) > dot(&query, &unrelated));
        assert!(dot(&query, &related) > 0.0);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let provider = HashingEmbeddingProvider::new(8);
        assert_eq!(provider.embed_sync("  ...  "), vec![0.0; 8]);
    }
}
