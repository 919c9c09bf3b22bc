//! Chatbot configuration.
//!
//! Values come from an optional TOML file; credentials come from the
//! environment (`OPENAI_API_KEY`, `OPENAI_BASE_URL`), with a `.env` file
//! honoured when present.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use chatbot_client::{OpenAIChatClient, OpenAIImageClient};
use chatbot_conversation::FileHistoryStore;
use chatbot_embeddings::{CachedProvider, EmbeddingCache, EmbeddingProvider, OpenAIProvider};
use chatbot_retrieval::RetrievalConfig;

use crate::error::{ChatbotError, Result};

/// Models and token limits for completion calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model answering questions.
    pub chat_model: String,

    /// Model condensing old turns.
    pub summary_model: String,

    /// Token limit for answers.
    pub answer_max_tokens: u32,

    /// Token limit for summaries.
    pub summary_max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4o-mini".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            answer_max_tokens: 500,
            summary_max_tokens: 200,
        }
    }
}

/// Bounds on per-session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Summarize once a history holds more turns than this.
    pub summarize_threshold: usize,

    /// Turns kept verbatim after a summary.
    pub retain_recent: usize,

    /// Hard ceiling on stored turns, applied even when summarizing fails.
    pub max_turns: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            summarize_threshold: 6,
            retain_recent: 4,
            max_turns: 40,
        }
    }
}

/// Where and for how long histories are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of `<session_id>.json` files.
    pub history_dir: PathBuf,

    /// Sessions idle longer than this many seconds may be purged.
    pub session_ttl_secs: Option<u64>,

    /// JSON file of cached corpus embeddings; no cache when unset.
    pub embedding_cache: Option<PathBuf>,

    /// Most vectors the embedding cache keeps.
    pub embedding_cache_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_dir: FileHistoryStore::default_dir(),
            session_ttl_secs: None,
            embedding_cache: None,
            embedding_cache_capacity: 10_000,
        }
    }
}

impl StorageConfig {
    /// Session TTL as a duration.
    pub fn session_ttl(&self) -> Option<Duration> {
        self.session_ttl_secs.map(Duration::from_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatbotConfig {
    pub models: ModelConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub storage: StorageConfig,

    /// API key; never read from or written to TOML.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API; the public API when unset.
    #[serde(skip)]
    pub base_url: Option<String>,
}

impl ChatbotConfig {
    /// Defaults plus credentials from the environment.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Parse TOML, then pick up credentials from the environment.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ChatbotError::Config(format!("invalid config: {e}")))?;
        let config = config.with_env();
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub async fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ChatbotError::Config(format!("{}: {e}", path.display())))?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Fill credentials from `OPENAI_API_KEY` / `OPENAI_BASE_URL`, loading
    /// `.env` first. Values already set are kept.
    pub fn with_env(mut self) -> Self {
        if dotenvy::dotenv().is_ok() {
            debug!("Loaded .env file");
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL").ok().filter(|u| !u.is_empty());
        }
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_history_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.history_dir = dir.into();
        self
    }

    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Check the values are mutually consistent.
    pub fn validate(&self) -> Result<()> {
        self.retrieval
            .validate()
            .map_err(|e| ChatbotError::Config(e.to_string()))?;

        let memory = &self.memory;
        if memory.retain_recent > memory.summarize_threshold {
            return Err(ChatbotError::Config(format!(
                "retain_recent ({}) must not exceed summarize_threshold ({})",
                memory.retain_recent, memory.summarize_threshold
            )));
        }
        if memory.max_turns <= memory.summarize_threshold {
            return Err(ChatbotError::Config(format!(
                "max_turns ({}) must exceed summarize_threshold ({})",
                memory.max_turns, memory.summarize_threshold
            )));
        }
        Ok(())
    }

    /// Chat client for the configured endpoint.
    pub fn chat_client(&self) -> OpenAIChatClient {
        let mut client = OpenAIChatClient::new();
        if let Some(key) = &self.api_key {
            client = client.with_api_key(key.as_str());
        }
        if let Some(url) = &self.base_url {
            client = client.with_base_url(url.as_str());
        }
        client
    }

    /// Image client for the configured endpoint.
    pub fn image_client(&self) -> OpenAIImageClient {
        let mut client = OpenAIImageClient::new();
        if let Some(key) = &self.api_key {
            client = client.with_api_key(key.as_str());
        }
        if let Some(url) = &self.base_url {
            client = client.with_base_url(url.as_str());
        }
        client
    }

    /// OpenAI embeddings for the configured endpoint and model.
    pub fn openai_embeddings(&self) -> OpenAIProvider {
        let mut provider = OpenAIProvider::new();
        if let Some(key) = &self.api_key {
            provider = provider.with_api_key(key.as_str());
        }
        if let Some(url) = &self.base_url {
            provider = provider.with_base_url(url.as_str());
        }
        if let Some(model) = &self.retrieval.embedding_model {
            provider = provider.with_model(model.as_str());
        }
        provider
    }

    /// The embedding provider, behind a persistent cache when
    /// `storage.embedding_cache` is set.
    pub async fn embedding_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider = self.openai_embeddings();
        let Some(path) = &self.storage.embedding_cache else {
            return Ok(Arc::new(provider));
        };

        let cache = EmbeddingCache::open(path, self.storage.embedding_cache_capacity).await?;
        debug!("Embedding cache at {}", path.display());
        Ok(Arc::new(CachedProvider::new(provider, cache)))
    }
}
