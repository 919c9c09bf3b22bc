//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chatbot_client::{ClientError, CompletionClient, CompletionRequest, CompletionResponse};
use chatbot_embeddings::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use chatbot_retrieval::{Retriever, RetrievalError};

/// Returns the same documents for every query.
pub struct StaticRetriever(pub Vec<String>);

#[async_trait]
impl Retriever for StaticRetriever {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_relevant_documents(&self, _query: &str) -> chatbot_retrieval::Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Always fails, as a dense retriever does when embedding is down.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get_relevant_documents(&self, _query: &str) -> chatbot_retrieval::Result<Vec<String>> {
        Err(RetrievalError::Config("embedding service unreachable".to_string()))
    }
}

/// How [`ScriptedClient`] answers.
#[derive(Clone, Copy)]
pub enum Script {
    /// Answer `answer N` (N counts calls), summaries with `summary N`.
    Numbered,
    /// Every call fails with a rate limit.
    RateLimited,
    /// Answers succeed, summary calls fail.
    SummaryFails,
    /// Every call succeeds with empty text.
    Silent,
}

/// Completion client that records requests and answers from a script.
pub struct ScriptedClient {
    script: Script,
    delay: Option<Duration>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests that asked for an answer rather than a summary.
    pub fn answer_requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !is_summary_request(r))
            .cloned()
            .collect()
    }

    pub fn summary_requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| is_summary_request(r))
            .cloned()
            .collect()
    }
}

fn is_summary_request(request: &CompletionRequest) -> bool {
    request
        .messages
        .first()
        .and_then(|m| m.content.as_deref())
        .is_some_and(|c| c.starts_with("Summarize"))
}

fn text(content: String) -> CompletionResponse {
    CompletionResponse {
        content: Some(content),
        tool_calls: Vec::new(),
        model: "scripted".to_string(),
        usage: None,
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> chatbot_client::Result<CompletionResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let summary = is_summary_request(&request);
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        match (self.script, summary) {
            (Script::RateLimited, _) | (Script::SummaryFails, true) => Err(ClientError::RateLimited {
                retry_after_secs: None,
                message: "quota exceeded".to_string(),
            }),
            (Script::Silent, _) => Ok(text(String::new())),
            (_, true) => Ok(text(format!("summary {n}"))),
            (_, false) => Ok(text(format!("answer {n}"))),
        }
    }
}

/// Embeds text as counts of a few topic keywords.
pub struct KeywordProvider;

const KEYWORDS: [&str; 5] = ["iso", "kitkat", "founded", "swiss", "cocoa"];

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn name(&self) -> &str {
        "keyword"
    }

    fn default_model(&self) -> &str {
        "keyword-1"
    }

    fn default_dimension(&self) -> usize {
        KEYWORDS.len()
    }

    async fn embed(&self, request: EmbeddingRequest) -> chatbot_embeddings::Result<EmbeddingResponse> {
        let lower = request.text.to_lowercase();
        let embedding: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: "keyword-1".to_string(),
            tokens_used: None,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
