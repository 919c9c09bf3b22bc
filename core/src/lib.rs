//! # Chatbot core
//!
//! A retrieval-grounded conversational chatbot:
//!
//! ```text
//! question ──► HybridRetriever ──► context ──► [system, ...history, user]
//!                                                      │
//!                                                      ▼
//!          HistoryStore ◄── summarize / cap ◄── CompletionClient ──► answer
//! ```
//!
//! Each session's history is loaded, extended with the new exchange,
//! summarized once it grows past a threshold, capped, and saved back, all
//! under a per-session lock.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = ChatbotConfig::from_env();
//! let bot = ConversationalChatbot::from_config(&config, Arc::new(Corpus::nestle_sample())).await?;
//!
//! let reply = bot.ask(None, "Is Nestle ISO certified?").await?;
//! let follow_up = bot.ask(Some(reply.session_id), "Which standard?").await?;
//! ```

pub mod chatbot;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod prompt;
pub mod qa;

pub use chatbot::{ChatReply, ConversationalChatbot, FALLBACK_ANSWER};
pub use config::{ChatbotConfig, MemoryConfig, ModelConfig, StorageConfig};
pub use error::{ChatbotError, Result};
pub use logging::init_logging;
pub use memory::{SUMMARY_PREFIX, SummaryModel, enforce_turn_cap, summarize_history};
pub use qa::{GroundedQa, MAX_DOCUMENT_CHARS, PlainQa};
