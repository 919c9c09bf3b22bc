//! Error types for conversation state.

use thiserror::Error;

/// Result type alias for conversation operations.
pub type Result<T> = std::result::Result<T, ConversationError>;

/// Errors that can occur while handling sessions and their history.
#[derive(Error, Debug)]
pub enum ConversationError {
    /// Session identifier rejected.
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read a history file or directory.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write a history file.
    #[error("failed to write file: {0}")]
    WriteFile(String),

    /// Failed to delete a history file.
    #[error("failed to delete file: {0}")]
    DeleteFile(String),
}
