//! Turns and the ordered history they form.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions or synthetic summaries.
    System,
    /// The human side.
    User,
    /// The model side.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Producer of the message.
    pub role: Role,

    /// Message text.
    pub content: String,
}

impl Turn {
    /// Create a turn.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// A system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// An assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The ordered turns of one session.
///
/// Serializes as a bare JSON array of `{role, content}` objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Append a user question and the assistant's answer.
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(answer));
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether there are no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Iterate turns oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// All turns oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The first turn, if any.
    pub fn first(&self) -> Option<&Turn> {
        self.turns.first()
    }

    /// The most recent `n` turns (all of them when fewer).
    pub fn last_n(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Split into (older turns, most recent `retain` turns).
    pub fn split_for_summary(&self, retain: usize) -> (&[Turn], &[Turn]) {
        let boundary = self.turns.len().saturating_sub(retain);
        self.turns.split_at(boundary)
    }

    /// Consume into the underlying turns.
    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

impl From<Vec<Turn>> for History {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl FromIterator<Turn> for History {
    fn from_iter<I: IntoIterator<Item = Turn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_history_serializes_as_plain_array() {
        let mut history = History::new();
        history.push_exchange("hi", "hello");

        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ])
        );
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let parsed: Result<History, _> =
            serde_json::from_str(r#"[{"role": "wizard", "content": "x"}]"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_split_for_summary() {
        let history: History = (0..6).map(|i| Turn::user(i.to_string())).collect();

        let (older, recent) = history.split_for_summary(4);
        assert_eq!(older.len(), 2);
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[0].content, "2");

        let (older, recent) = history.split_for_summary(10);
        assert!(older.is_empty());
        assert_eq!(recent.len(), 6);
        assert_eq!(history.last_n(2), &history.turns()[4..]);
    }
}
