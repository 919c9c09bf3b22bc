//! Single-shot question answering, with and without a reference document.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use chatbot_client::{ChatMessage, ClientError, CompletionClient, CompletionRequest};

use crate::error::Result;

/// Characters of the reference document sent with each question.
pub const MAX_DOCUMENT_CHARS: usize = 6000;

fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ClientError::InvalidInput("prompt cannot be empty".to_string()).into());
    }
    Ok(())
}

/// Forwards a prompt as a single user message.
pub struct PlainQa {
    client: Arc<dyn CompletionClient>,
    model: String,
}

impl PlainQa {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// The model's reply to `prompt`.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        require_text(prompt)?;
        let request = CompletionRequest::new(self.model.as_str(), vec![ChatMessage::user(prompt)]);
        Ok(self.client.complete(request).await?.into_text()?)
    }
}

/// Answers questions about one reference document.
pub struct GroundedQa {
    client: Arc<dyn CompletionClient>,
    model: String,
    document: String,
}

impl GroundedQa {
    /// Use `document`, truncated to [`MAX_DOCUMENT_CHARS`].
    pub fn new(
        client: Arc<dyn CompletionClient>,
        model: impl Into<String>,
        document: &str,
    ) -> Self {
        let document: String = document.chars().take(MAX_DOCUMENT_CHARS).collect();
        debug!("Grounding on {} characters", document.chars().count());
        Self {
            client,
            model: model.into(),
            document,
        }
    }

    /// Read the reference document from a local text file.
    pub async fn from_file(
        client: Arc<dyn CompletionClient>,
        model: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        info!("Loaded reference document {}", path.display());
        Ok(Self::new(client, model, &text))
    }

    /// The reference text actually sent.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Prompt sent for `question`.
    pub fn prompt(&self, question: &str) -> String {
        format!(
            "Use the following website content to answer:\n\n{}\n\nQuestion: {question}",
            self.document
        )
    }

    /// The model's answer to `question`.
    pub async fn ask(&self, question: &str) -> Result<String> {
        require_text(question)?;
        let request = CompletionRequest::new(
            self.model.as_str(),
            vec![ChatMessage::user(self.prompt(question))],
        );
        Ok(self.client.complete(request).await?.into_text()?)
    }
}
