//! History persistence.
//!
//! A [`HistoryStore`] maps a [`SessionId`] to its [`History`]. Loading never
//! fails: a missing or unreadable history is an empty one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, StorageError};
use crate::session::SessionId;
use crate::turn::History;

/// Storage backend for per-session histories.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The stored history, or an empty one when absent or corrupt.
    async fn load(&self, id: &SessionId) -> History;

    /// Replace the stored history.
    async fn save(&self, id: &SessionId, history: &History) -> Result<()>;

    /// Remove a session. Returns whether anything was removed.
    async fn delete(&self, id: &SessionId) -> Result<bool>;

    /// Every stored session.
    async fn list_sessions(&self) -> Result<Vec<SessionId>>;

    /// Remove sessions not written within `max_age`. Returns how many went.
    async fn purge_older_than(&self, max_age: Duration) -> Result<usize>;
}

/// One pretty-printed `<session_id>.json` file per session.
pub struct FileHistoryStore {
    root: PathBuf,
}

impl FileHistoryStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", root.display())))?;

        debug!("History store at {}", root.display());
        Ok(Self { root })
    }

    /// `<data_dir>/chatbot/sessions`, falling back to `./sessions`.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("chatbot").join("sessions"))
            .unwrap_or_else(|| PathBuf::from("sessions"))
    }

    /// Directory holding the history files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_path(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn read_history(path: &Path) -> Result<History> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Session files currently on disk, with their modification times.
    async fn session_files(&self) -> Result<Vec<(SessionId, PathBuf, Option<SystemTime>)>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", self.root.display())))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFile(format!("{e}")))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| SessionId::parse(stem).ok())
            else {
                continue;
            };
            let modified = entry.metadata().await.ok().and_then(|m| m.modified().ok());
            files.push((id, path, modified));
        }
        Ok(files)
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self, id: &SessionId) -> History {
        let path = self.session_path(id);
        match fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => return History::new(),
            Err(e) => {
                warn!("Cannot check history file {}: {e}", path.display());
                return History::new();
            }
        }

        match Self::read_history(&path).await {
            Ok(history) => {
                debug!("Loaded {} turns for session {id}", history.len());
                history
            }
            Err(e) => {
                warn!("Discarding unreadable history {}: {e}", path.display());
                History::new()
            }
        }
    }

    async fn save(&self, id: &SessionId, history: &History) -> Result<()> {
        let path = self.session_path(id);
        let content = serde_json::to_string_pretty(history)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", path.display())))?;

        debug!("Saved {} turns for session {id}", history.len());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool> {
        let path = self.session_path(id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted session {id}");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFile(format!("{}: {e}", path.display())).into()),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<SessionId>> {
        let mut ids: Vec<SessionId> = self
            .session_files()
            .await?
            .into_iter()
            .map(|(id, _, _)| id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn purge_older_than(&self, max_age: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut purged = 0;

        for (id, path, modified) in self.session_files().await? {
            let age = modified.and_then(|m| now.duration_since(m).ok());
            if age.is_some_and(|age| age > max_age) {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| StorageError::DeleteFile(format!("{}: {e}", path.display())))?;
                debug!("Purged session {id}");
                purged += 1;
            }
        }

        if purged > 0 {
            info!("Purged {purged} expired sessions");
        }
        Ok(purged)
    }
}

/// Process-local store.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    sessions: RwLock<HashMap<SessionId, (History, Instant)>>,
}

impl InMemoryHistoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn load(&self, id: &SessionId) -> History {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|(history, _)| history.clone())
            .unwrap_or_default()
    }

    async fn save(&self, id: &SessionId, history: &History) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(id.clone(), (history.clone(), Instant::now()));
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionId>> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn purge_older_than(&self, max_age: Duration) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, (_, written)| written.elapsed() <= max_age);
        Ok(before - sessions.len())
    }
}
