//! Prompt assembly for grounded answers.

use chatbot_client::ChatMessage;
use chatbot_conversation::History;

/// Join retrieved passages into one context block, one per line.
pub fn build_context(documents: &[String]) -> String {
    documents.join("\n")
}

/// System instruction restricting answers to `context`.
pub fn system_instruction(context: &str) -> String {
    format!(
        "You are a helpful assistant. Answer the user's question using only the context below. \
         If the answer is not contained in the context, say \"I do not know\".\n\n\
         Context:\n{context}"
    )
}

/// `[system instruction, ...history, question]`.
pub fn assemble_messages(context: &str, history: &History, question: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_instruction(context)));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(question));
    messages
}
