//! # Client
//!
//! Clients for OpenAI-compatible model endpoints:
//!
//! - [`CompletionClient`] / [`OpenAIChatClient`]: `/chat/completions`, with tool calling
//! - [`ImageClient`] / [`OpenAIImageClient`]: `/images/generations` and `/images/edits`
//!
//! Both read `OPENAI_API_KEY` (and optionally `OPENAI_BASE_URL`) from the
//! environment and map HTTP failures onto [`ClientError`].

pub mod chat;
pub mod error;
mod http;
pub mod images;

pub use chat::{
    ChatMessage, ChatRole, CompletionClient, CompletionRequest, CompletionResponse, FunctionCall,
    OpenAIChatClient, ToolCall, ToolChoice, Usage,
};
pub use error::{ClientError, Result};
pub use images::{
    GeneratedImage, ImageClient, ImageEditRequest, ImageGenerationRequest, ImageInput,
    OpenAIImageClient,
};
