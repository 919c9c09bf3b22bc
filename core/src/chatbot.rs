//! Retrieval-grounded, multi-turn chatbot.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use chatbot_client::{CompletionClient, CompletionRequest, CompletionResponse};
use chatbot_conversation::{FileHistoryStore, History, HistoryStore, SessionId, SessionLocks};
use chatbot_retrieval::{Corpus, HybridRetriever, Retriever};

use crate::config::{ChatbotConfig, MemoryConfig, ModelConfig};
use crate::error::Result;
use crate::memory::{self, SummaryModel};
use crate::prompt;

/// Answer returned when the completion service fails.
pub const FALLBACK_ANSWER: &str = "Error occurred.";

/// The answer to one question, with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub answer: String,
}

/// Answers questions from retrieved context while remembering each session.
///
/// Every [`ask`](Self::ask) runs load, answer, summarize, save under the
/// session's lock, so concurrent questions in one session are applied one
/// after the other and none is lost.
pub struct ConversationalChatbot {
    retriever: Arc<dyn Retriever>,
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn HistoryStore>,
    locks: SessionLocks,
    models: ModelConfig,
    memory: MemoryConfig,
    session_ttl: Option<Duration>,
}

impl ConversationalChatbot {
    /// Create a chatbot with default models and memory bounds.
    pub fn new(
        retriever: Arc<dyn Retriever>,
        client: Arc<dyn CompletionClient>,
        store: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            retriever,
            client,
            store,
            locks: SessionLocks::new(),
            models: ModelConfig::default(),
            memory: MemoryConfig::default(),
            session_ttl: None,
        }
    }

    /// Build the hybrid retriever, OpenAI clients and file store from `config`.
    pub async fn from_config(config: &ChatbotConfig, corpus: Arc<Corpus>) -> Result<Self> {
        config.validate()?;

        let provider = config.embedding_provider().await?;
        let retriever = HybridRetriever::from_config(corpus, provider, &config.retrieval).await?;
        let store = FileHistoryStore::new(&config.storage.history_dir).await?;

        info!(
            "Chatbot ready: {:?} fusion, histories in {}",
            retriever.fusion(),
            config.storage.history_dir.display()
        );

        Ok(Self::new(
            Arc::new(retriever),
            Arc::new(config.chat_client()),
            Arc::new(store),
        )
        .with_models(config.models.clone())
        .with_memory(config.memory)
        .with_session_ttl(config.storage.session_ttl()))
    }

    pub fn with_models(mut self, models: ModelConfig) -> Self {
        self.models = models;
        self
    }

    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Answer `question` given prior `history`.
    ///
    /// Retrieval errors propagate. Completion errors are logged and become
    /// [`FALLBACK_ANSWER`].
    pub async fn generate_answer(&self, question: &str, history: &History) -> Result<String> {
        let documents = self.retriever.get_relevant_documents(question).await?;
        debug!(
            "{} retriever returned {} documents",
            self.retriever.name(),
            documents.len()
        );

        let context = prompt::build_context(&documents);
        let messages = prompt::assemble_messages(&context, history, question);
        let request = CompletionRequest::new(self.models.chat_model.as_str(), messages)
            .with_max_tokens(self.models.answer_max_tokens);

        match self
            .client
            .complete(request)
            .await
            .and_then(CompletionResponse::into_text)
        {
            Ok(answer) => Ok(answer),
            Err(e) => {
                warn!("Completion via {} failed: {e}", self.client.name());
                Ok(FALLBACK_ANSWER.to_string())
            }
        }
    }

    /// Summarize `history` once it passes the configured threshold.
    pub async fn summarize_history(&self, history: History) -> History {
        let model = SummaryModel {
            model: self.models.summary_model.clone(),
            max_tokens: self.models.summary_max_tokens,
        };
        memory::summarize_history(history, self.client.as_ref(), &model, &self.memory).await
    }

    /// Apply the hard turn ceiling.
    pub fn enforce_turn_cap(&self, history: History) -> History {
        memory::enforce_turn_cap(history, self.memory.max_turns)
    }

    /// Answer a question within a session, minting a session when none is given.
    pub async fn ask(&self, session_id: Option<SessionId>, question: &str) -> Result<ChatReply> {
        let session_id = session_id.unwrap_or_default();
        let _guard = self.locks.lock(&session_id).await;

        let mut history = self.store.load(&session_id).await;
        let answer = self.generate_answer(question, &history).await?;

        history.push_exchange(question, answer.as_str());
        let history = self.summarize_history(history).await;
        let history = self.enforce_turn_cap(history);
        self.store.save(&session_id, &history).await?;

        debug!("Session {session_id} now holds {} turns", history.len());
        Ok(ChatReply { session_id, answer })
    }

    /// Current stored history of a session.
    pub async fn history(&self, session_id: &SessionId) -> History {
        self.store.load(session_id).await
    }

    /// Forget a session. Returns whether it existed.
    pub async fn reset_session(&self, session_id: &SessionId) -> Result<bool> {
        let _guard = self.locks.lock(session_id).await;
        Ok(self.store.delete(session_id).await?)
    }

    /// Remove sessions idle for longer than the configured TTL.
    ///
    /// Without a TTL no history is removed.
    pub async fn purge_expired_sessions(&self) -> Result<usize> {
        self.locks.prune();
        let Some(ttl) = self.session_ttl else {
            return Ok(0);
        };
        Ok(self.store.purge_older_than(ttl).await?)
    }

    /// Sessions currently locked by an in-flight call or awaited by one.
    pub fn active_session_locks(&self) -> usize {
        self.locks.len()
    }
}
