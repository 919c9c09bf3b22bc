//! # Conversation
//!
//! Conversation state for a multi-turn chatbot:
//!
//! - [`Turn`] / [`History`]: the ordered messages of one session
//! - [`SessionId`]: opaque, file-safe session identifiers
//! - [`HistoryStore`]: persistence, on disk ([`FileHistoryStore`]) or in memory
//! - [`SessionLocks`]: mutual exclusion over a session's load, modify, save cycle
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = FileHistoryStore::new(FileHistoryStore::default_dir()).await?;
//! let id = SessionId::new();
//!
//! let _guard = locks.lock(&id).await;
//! let mut history = store.load(&id).await;
//! history.push_exchange("Hi", "Hello!");
//! store.save(&id, &history).await?;
//! ```

pub mod error;
pub mod session;
pub mod storage;
pub mod turn;

pub use error::{ConversationError, Result, StorageError};
pub use session::{SessionGuard, SessionId, SessionLocks};
pub use storage::{FileHistoryStore, HistoryStore, InMemoryHistoryStore};
pub use turn::{History, Role, Turn};
