//! Embedding errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// No API key was supplied or found in the environment.
    #[error("embedding provider not configured: OPENAI_API_KEY is not set")]
    NotConfigured,

    /// HTTP 429 from the embeddings endpoint.
    #[error("embedding rate limit exceeded{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-success status.
    #[error("embeddings API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The service answered, but not with what was asked for.
    #[error("invalid embeddings response: {0}")]
    InvalidResponse(String),

    /// Query and index vectors disagree on length.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing a persisted cache.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed persisted cache or index JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}
