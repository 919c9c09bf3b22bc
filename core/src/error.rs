//! Error types for the chatbot pipeline.

use thiserror::Error;

/// Result type alias for chatbot operations.
pub type Result<T> = std::result::Result<T, ChatbotError>;

/// Errors surfaced by the chatbot.
///
/// Completion failures inside a conversation are not among them: those turn
/// into a fallback answer instead.
#[derive(Error, Debug)]
pub enum ChatbotError {
    /// Retrieval failed, typically while embedding the query.
    #[error("retrieval error: {0}")]
    Retrieval(#[from] chatbot_retrieval::RetrievalError),

    /// Embedding setup failed, e.g. an unusable cache path.
    #[error("embedding error: {0}")]
    Embedding(#[from] chatbot_embeddings::EmbeddingError),

    /// Session or history persistence failed.
    #[error("conversation error: {0}")]
    Conversation(#[from] chatbot_conversation::ConversationError),

    /// Model client failed where no fallback applies.
    #[error("client error: {0}")]
    Client(#[from] chatbot_client::ClientError),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
