//! Two-turn conversation over the built-in Nestlé corpus.
//!
//! Needs `OPENAI_API_KEY`; reads `chatbot.toml` from the working directory
//! when present.

use std::sync::Arc;

use chatbot_core::{ChatbotConfig, ConversationalChatbot, init_logging};
use chatbot_retrieval::Corpus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("chatbot_core=info,chatbot_retrieval=info");

    let config = match tokio::fs::try_exists("chatbot.toml").await {
        Ok(true) => ChatbotConfig::from_toml_file("chatbot.toml").await?,
        _ => ChatbotConfig::from_env(),
    };

    let bot = ConversationalChatbot::from_config(&config, Arc::new(Corpus::nestle_sample())).await?;

    let first = bot.ask(None, "Is Nestle ISO certified?").await?;
    println!("Bot: {}", first.answer);

    let second = bot
        .ask(Some(first.session_id.clone()), "Which food safety standards do they follow?")
        .await?;
    println!("Bot: {}", second.answer);
    println!("Session: {}", second.session_id);

    Ok(())
}
