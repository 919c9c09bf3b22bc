//! Bounding per-session history.
//!
//! Two mechanisms keep a history small. Summarization collapses everything
//! but the most recent turns into one synthetic system turn once the history
//! passes a threshold. The turn cap drops the oldest raw turns outright, so
//! the history stays bounded even when summarization keeps failing.

use chatbot_client::{ChatMessage, CompletionClient, CompletionRequest, CompletionResponse};
use chatbot_conversation::{History, Role, Turn};
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;

/// Prefix of the synthetic turn that replaces summarized history.
pub const SUMMARY_PREFIX: &str = "Summary of previous chat: ";

const SUMMARY_INSTRUCTION: &str = "Summarize the following conversation in a few sentences. \
     Keep names, facts and open questions needed to continue it.";

/// Model settings for summary calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryModel {
    pub model: String,
    pub max_tokens: u32,
}

/// Whether `turn` is a summary produced by [`summarize_history`].
pub fn is_summary(turn: &Turn) -> bool {
    turn.role == Role::System && turn.content.starts_with(SUMMARY_PREFIX)
}

/// Collapse all but the most recent `retain_recent` turns into a summary turn.
///
/// Histories no longer than `summarize_threshold` come back unchanged, as
/// does the original history when the summary call fails.
pub async fn summarize_history(
    history: History,
    client: &dyn CompletionClient,
    model: &SummaryModel,
    memory: &MemoryConfig,
) -> History {
    if history.len() <= memory.summarize_threshold {
        return history;
    }

    let (older, recent) = history.split_for_summary(memory.retain_recent);
    let transcript = older
        .iter()
        .map(|turn| turn.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let request = CompletionRequest::new(
        model.model.as_str(),
        vec![
            ChatMessage::system(SUMMARY_INSTRUCTION),
            ChatMessage::user(transcript),
        ],
    )
    .with_max_tokens(model.max_tokens);

    let summary = match client.complete(request).await.and_then(CompletionResponse::into_text) {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Summarization failed, keeping {} turns: {e}", history.len());
            return history;
        }
    };

    info!(
        "Summarized {} turns, keeping {} recent",
        older.len(),
        recent.len()
    );

    std::iter::once(Turn::system(format!("{SUMMARY_PREFIX}{summary}")))
        .chain(recent.iter().cloned())
        .collect()
}

/// Drop the oldest turns beyond `max_turns`, keeping a leading summary turn.
pub fn enforce_turn_cap(history: History, max_turns: usize) -> History {
    if history.len() <= max_turns {
        return history;
    }

    let dropped = history.len() - max_turns;
    let capped: History = match history.first() {
        Some(first) if is_summary(first) && max_turns > 0 => {
            std::iter::once(first.clone())
                .chain(history.last_n(max_turns - 1).iter().cloned())
                .collect()
        }
        _ => history.last_n(max_turns).iter().cloned().collect(),
    };

    debug!("Turn cap dropped {dropped} turns");
    capped
}
