//! Error types for tools and the tool agent.

use chatbot_client::ClientError;
use thiserror::Error;

/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors that can occur while registering or running tools.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Tool already registered under this name.
    #[error("tool already exists: {0}")]
    AlreadyExists(String),

    /// Arguments do not match the tool's parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Tool ran but could not produce a result.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Model service call failed.
    #[error("{0}")]
    Client(#[from] ClientError),
}
