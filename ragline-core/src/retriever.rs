//! Top-k retrieval over a [`VectorIndex`].

use std::sync::Arc;

use tracing::debug;

use crate::document::RetrievedDocument;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Fetches the chunks most relevant to a query.
pub struct Retriever {
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl Retriever {
    /// Retrieve up to `top_k` chunks per query from `index`.
    pub fn new(index: Arc<VectorIndex>, top_k: usize) -> Self {
        Self { index, top_k }
    }

    /// The configured retrieval depth.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub(crate) fn set_top_k(&mut self, top_k: usize) {
        self.top_k = top_k;
    }

    /// Return the `min(top_k, corpus size)` chunks closest to `query`.
    ///
    /// A ready index with no chunks yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] if the index has not been built or loaded.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        if !self.index.is_ready().await {
            return Err(RagError::NotReady);
        }

        let corpus = self.index.len().await?;
        if corpus == 0 {
            debug!("index is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let results = self.index.search(query, self.top_k.min(corpus)).await?;
        debug!(result_count = results.len(), "retrieved documents");
        Ok(results)
    }
}
