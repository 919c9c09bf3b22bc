//! Session identifiers and per-session locking.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{ConversationError, Result};

const MAX_ID_LEN: usize = 128;

/// Opaque identifier of one conversation.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted, so an id is always a
/// safe file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Validate a caller-supplied id.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_ID_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(id))
        } else {
            Err(ConversationError::InvalidSessionId(id))
        }
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = ConversationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ConversationError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

type LockMap = HashMap<SessionId, Arc<Mutex<()>>>;

/// Registry of one async mutex per session.
///
/// Holding the guard serializes a session's load, modify, save cycle;
/// different sessions never contend. An entry lives only while some caller
/// holds or waits on it: the last [`SessionGuard`] to drop removes it.
#[derive(Default)]
pub struct SessionLocks {
    locks: Arc<std::sync::Mutex<LockMap>>,
}

/// Exclusive access to one session, released on drop.
pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    id: SessionId,
    registry: Arc<std::sync::Mutex<LockMap>>,
}

impl SessionGuard {
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self
            .registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Waiters clone the Arc under this map lock, so a count of one means
        // nobody else holds or is queued on the session.
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

impl SessionLocks {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, LockMap> {
        self.locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Wait for exclusive access to `id`.
    pub async fn lock(&self, id: &SessionId) -> SessionGuard {
        let lock = Arc::clone(self.registry().entry(id.clone()).or_default());
        SessionGuard {
            guard: Some(lock.lock_owned().await),
            id: id.clone(),
            registry: Arc::clone(&self.locks),
        }
    }

    /// Drop registry entries that nobody is holding or waiting on.
    pub fn prune(&self) {
        self.registry()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of sessions currently locked or awaited.
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    /// Whether no locks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
