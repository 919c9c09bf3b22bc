//! Error types for the completion and image clients.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by the remote model clients.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No API key available.
    #[error("client not configured: OPENAI_API_KEY is not set")]
    NotConfigured,

    /// Request rejected locally before any HTTP call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Quota or rate limit exceeded (HTTP 429).
    #[error("rate limited (retry after {retry_after_secs:?}s): {message}")]
    RateLimited {
        /// Seconds from the `retry-after` header, when sent.
        retry_after_secs: Option<u64>,
        /// Message from the error body.
        message: String,
    },

    /// Request rejected by the service (HTTP 400), including safety rejections.
    #[error("request rejected: {0}")]
    BadRequest(String),

    /// Any other non-success status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error body.
        message: String,
    },

    /// Network or protocol failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Success status with nothing usable in the body.
    #[error("empty response from model")]
    EmptyResponse,

    /// Base64 image payload could not be decoded.
    #[error("invalid image data: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
