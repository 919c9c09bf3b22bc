//! Error types for document retrieval.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while building or querying retrievers.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding error, propagated untouched from the provider.
    #[error("embedding error: {0}")]
    Embedding(#[from] chatbot_embeddings::EmbeddingError),

    /// The provider answered with a different number of vectors than asked.
    #[error("expected {expected} embeddings, provider returned {actual}")]
    EmbeddingCount { expected: usize, actual: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
