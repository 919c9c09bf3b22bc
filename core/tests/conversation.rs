mod common;

use std::sync::Arc;
use std::time::Duration;

use chatbot_client::ChatRole;
use chatbot_conversation::{
    FileHistoryStore, History, HistoryStore, InMemoryHistoryStore, Role, SessionId, Turn,
};
use chatbot_core::{ChatbotError, ConversationalChatbot, FALLBACK_ANSWER, MemoryConfig};
use common::{FailingRetriever, Script, ScriptedClient, StaticRetriever};
use pretty_assertions::assert_eq;

const ISO: &str = "Nestlé factories follow ISO 22000 and HACCP food safety standards.";

fn chatbot(
    client: Arc<ScriptedClient>,
    store: Arc<dyn HistoryStore>,
) -> ConversationalChatbot {
    ConversationalChatbot::new(
        Arc::new(StaticRetriever(vec![ISO.to_string(), "Founded in 1866.".to_string()])),
        client,
        store,
    )
}

#[tokio::test]
async fn first_ask_mints_session_and_persists_exchange() {
    let client = Arc::new(ScriptedClient::new(Script::Numbered));
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = chatbot(client.clone(), store.clone());

    let reply = bot.ask(None, "Is Nestle ISO certified?").await.unwrap();
    assert_eq!(reply.answer, "answer 1");

    let history = store.load(&reply.session_id).await;
    assert_eq!(
        history.turns(),
        &[
            Turn::user("Is Nestle ISO certified?"),
            Turn::assistant("answer 1")
        ]
    );
}

#[tokio::test]
async fn prompt_starts_with_context_then_history() {
    let client = Arc::new(ScriptedClient::new(Script::Numbered));
    let bot = chatbot(client.clone(), Arc::new(InMemoryHistoryStore::new()));

    let first = bot.ask(None, "Is Nestle ISO certified?").await.unwrap();
    bot.ask(Some(first.session_id), "Which standard?").await.unwrap();

    let requests = client.answer_requests();
    assert_eq!(requests.len(), 2);

    let first_messages = &requests[0].messages;
    assert_eq!(first_messages.len(), 2);
    assert_eq!(first_messages[0].role, ChatRole::System);
    let system = first_messages[0].content.as_deref().unwrap();
    assert!(system.contains(&format!("{ISO}\nFounded in 1866.")));
    assert_eq!(requests[0].max_tokens, Some(500));
    assert_eq!(requests[0].model, "gpt-4o-mini");

    let second: Vec<(ChatRole, Option<&str>)> = requests[1]
        .messages
        .iter()
        .skip(1)
        .map(|m| (m.role, m.content.as_deref()))
        .collect();
    assert_eq!(
        second,
        vec![
            (ChatRole::User, Some("Is Nestle ISO certified?")),
            (ChatRole::Assistant, Some("answer 1")),
            (ChatRole::User, Some("Which standard?")),
        ]
    );
}

#[tokio::test]
async fn completion_failure_becomes_fallback_answer() {
    let client = Arc::new(ScriptedClient::new(Script::RateLimited));
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = chatbot(client, store.clone());

    let reply = bot.ask(None, "anything").await.unwrap();
    assert_eq!(reply.answer, FALLBACK_ANSWER);
    assert_eq!(
        store.load(&reply.session_id).await.turns()[1],
        Turn::assistant("Error occurred.")
    );
}

#[tokio::test]
async fn empty_completion_is_an_answer_not_a_failure() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = chatbot(Arc::new(ScriptedClient::new(Script::Silent)), store.clone());

    let reply = bot.ask(None, "anything").await.unwrap();
    assert_eq!(reply.answer, "");
    assert_eq!(
        store.load(&reply.session_id).await.turns()[1],
        Turn::assistant("")
    );
}

#[tokio::test]
async fn retrieval_failure_propagates_and_saves_nothing() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = ConversationalChatbot::new(
        Arc::new(FailingRetriever),
        Arc::new(ScriptedClient::new(Script::Numbered)),
        store.clone(),
    );

    let id = SessionId::new();
    let err = bot.ask(Some(id.clone()), "q").await.unwrap_err();
    assert!(matches!(err, ChatbotError::Retrieval(_)));
    assert!(store.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn fourth_exchange_triggers_summary() {
    let client = Arc::new(ScriptedClient::new(Script::Numbered));
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = chatbot(client.clone(), store.clone());
    let id = SessionId::new();

    for i in 0..3 {
        bot.ask(Some(id.clone()), &format!("q{i}")).await.unwrap();
    }
    assert_eq!(store.load(&id).await.len(), 6);
    assert!(client.summary_requests().is_empty());

    bot.ask(Some(id.clone()), "q3").await.unwrap();

    let history = store.load(&id).await;
    assert_eq!(history.len(), 5);
    assert_eq!(history.turns()[0].role, Role::System);
    assert_eq!(history.turns()[1], Turn::user("q2"));
    assert_eq!(history.turns()[4], Turn::assistant("answer 4"));
    assert_eq!(
        history.turns()[0].content,
        "Summary of previous chat: summary 5"
    );

    let summaries = client.summary_requests();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].max_tokens, Some(200));
    assert_eq!(
        summaries[0].messages[1].content.as_deref(),
        Some("q0\nanswer 1\nq1\nanswer 2")
    );
}

#[tokio::test]
async fn failing_summaries_are_bounded_by_turn_cap() {
    let client = Arc::new(ScriptedClient::new(Script::SummaryFails));
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = chatbot(client, store.clone()).with_memory(MemoryConfig {
        summarize_threshold: 2,
        retain_recent: 2,
        max_turns: 6,
    });
    let id = SessionId::new();

    for i in 0..10 {
        bot.ask(Some(id.clone()), &format!("q{i}")).await.unwrap();
    }

    let history = store.load(&id).await;
    assert_eq!(history.len(), 6);
    assert_eq!(history.turns()[4], Turn::user("q9"));
}

#[tokio::test]
async fn concurrent_asks_on_one_session_lose_nothing() {
    let client =
        Arc::new(ScriptedClient::new(Script::Numbered).with_delay(Duration::from_millis(5)));
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = Arc::new(
        chatbot(client, store.clone()).with_memory(MemoryConfig {
            summarize_threshold: 100,
            retain_recent: 4,
            max_turns: 200,
        }),
    );
    let id = SessionId::new();

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let bot = Arc::clone(&bot);
            let id = id.clone();
            tokio::spawn(async move { bot.ask(Some(id), &format!("q{i}")).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let history: History = store.load(&id).await;
    assert_eq!(history.len(), 20);
    let mut questions: Vec<&str> = history
        .iter()
        .filter(|t| t.role == Role::User)
        .map(|t| t.content.as_str())
        .collect();
    questions.sort_unstable();
    let mut expected: Vec<String> = (0..10).map(|i| format!("q{i}")).collect();
    expected.sort_unstable();
    assert_eq!(questions, expected);
}

#[tokio::test]
async fn reset_and_purge_sessions() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = chatbot(Arc::new(ScriptedClient::new(Script::Numbered)), store.clone());

    let a = bot.ask(None, "a").await.unwrap().session_id;
    let b = bot.ask(None, "b").await.unwrap().session_id;

    assert!(bot.reset_session(&a).await.unwrap());
    assert!(!bot.reset_session(&a).await.unwrap());
    assert!(bot.history(&a).await.is_empty());

    // No TTL configured: nothing is purged.
    assert_eq!(bot.purge_expired_sessions().await.unwrap(), 0);

    let bot = bot.with_session_ttl(Some(Duration::from_millis(1)));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(bot.purge_expired_sessions().await.unwrap(), 1);
    assert!(bot.history(&b).await.is_empty());
}

#[tokio::test]
async fn finished_sessions_release_their_locks() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let bot = chatbot(Arc::new(ScriptedClient::new(Script::Numbered)), store);

    let mut sessions = Vec::new();
    for i in 0..200 {
        let reply = bot.ask(None, &format!("q{i}")).await.unwrap();
        sessions.push(reply.session_id);
    }
    assert_eq!(bot.active_session_locks(), 0);

    for id in &sessions {
        assert!(bot.reset_session(id).await.unwrap());
    }
    assert_eq!(bot.active_session_locks(), 0);
    assert_eq!(bot.purge_expired_sessions().await.unwrap(), 0);
}

#[tokio::test]
async fn file_store_survives_a_restart() {
    let temp = tempfile::TempDir::new().unwrap();
    let id = SessionId::parse("customer-7").unwrap();

    {
        let store = Arc::new(FileHistoryStore::new(temp.path()).await.unwrap());
        let bot = chatbot(Arc::new(ScriptedClient::new(Script::Numbered)), store);
        bot.ask(Some(id.clone()), "first").await.unwrap();
    }

    let client = Arc::new(ScriptedClient::new(Script::Numbered));
    let store = Arc::new(FileHistoryStore::new(temp.path()).await.unwrap());
    let bot = chatbot(client.clone(), store);
    bot.ask(Some(id.clone()), "second").await.unwrap();

    assert!(temp.path().join("customer-7.json").exists());
    assert_eq!(bot.history(&id).await.len(), 4);
    assert_eq!(
        client.answer_requests()[0].messages[1].content.as_deref(),
        Some("first")
    );
}
