//! Error types for the `ragline-core` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// Generation failures are deliberately absent: they are reported in-band
/// through [`GeneratedAnswer`](crate::generator::GeneratedAnswer).
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The vector index has not been built or loaded yet.
    #[error("Index not ready: build or load an index first")]
    NotReady,

    /// `build` was called without any chunks.
    #[error("No documents provided")]
    EmptyInput,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An embedding did not have the dimension the index expects.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension reported by the embedding provider.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// A saved index is corrupt or inconsistent with its metadata.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A filesystem operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Failure of a single chat-completion call.
///
/// Never escapes [`Generator::generate`](crate::Generator::generate); it is
/// folded into [`GeneratedAnswer::Failed`](crate::GeneratedAnswer::Failed).
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail reported by the service.
        message: String,
    },

    /// The response body was not a usable completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
