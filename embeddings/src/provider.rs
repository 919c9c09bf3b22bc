//! Text-to-vector providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "text-embedding-3-small";

/// One text to embed, with optional model and size overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub text: String,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
}

impl EmbeddingRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            dimensions: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Ask for a shortened vector, where the model supports it.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

/// A vector plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Embedding,
    pub model: String,
    pub dimension: usize,
    pub tokens_used: Option<u64>,
}

impl EmbeddingResponse {
    fn new(embedding: Embedding, model: impl Into<String>, tokens_used: Option<u64>) -> Self {
        Self {
            dimension: embedding.len(),
            embedding,
            model: model.into(),
            tokens_used,
        }
    }
}

/// Anything that turns text into embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Model used when a request names none.
    fn default_model(&self) -> &str;

    /// Vector length produced by [`default_model`](Self::default_model).
    fn default_dimension(&self) -> usize;

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Embed several texts; results line up with `requests`.
    ///
    /// The default issues one [`embed`](Self::embed) call per request.
    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(self.embed(request).await?);
        }
        Ok(responses)
    }

    /// Whether calls can succeed at all (credentials present, etc.).
    fn is_available(&self) -> bool;
}

/// Body of `POST /embeddings`.
#[derive(Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsReply {
    data: Vec<EmbeddingItem>,
    model: String,
    #[serde(default)]
    usage: Option<EmbeddingsUsage>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Embedding,
    index: usize,
}

#[derive(Deserialize)]
struct EmbeddingsUsage {
    total_tokens: u64,
}

/// `/embeddings` on an OpenAI-compatible endpoint.
///
/// Batches go out as a single request with an array `input`; the reply's
/// `index` field puts vectors back in request order.
#[derive(Clone)]
pub struct OpenAIProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAIProvider {
    /// Provider keyed from `OPENAI_API_KEY`, using `text-embedding-3-small`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: OPENAI_BASE_URL.to_string(),
            model: OPENAI_MODEL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn call(&self, body: &EmbeddingsBody<'_>) -> Result<EmbeddingsReply> {
        let key = self.api_key.as_deref().ok_or(EmbeddingError::NotConfigured)?;

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            warn!("Embeddings endpoint rate limited the request");
            return Err(EmbeddingError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.unwrap_or_default();
        Err(EmbeddingError::Api {
            status: status.as_u16(),
            message: api_message(&body),
        })
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// `error.message` from an OpenAI error body, or the body itself.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn default_dimension(&self) -> usize {
        if self.model == "text-embedding-3-large" {
            3072
        } else {
            crate::DEFAULT_DIMENSION
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let reply = self
            .call(&EmbeddingsBody {
                model,
                input: vec![request.text.as_str()],
                dimensions: request.dimensions,
            })
            .await?;

        let tokens = reply.usage.map(|u| u.total_tokens);
        let item = reply
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".to_string()))?;

        debug!("Embedded text into {} dimensions", item.embedding.len());
        Ok(EmbeddingResponse::new(item.embedding, reply.model, tokens))
    }

    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        let Some(first) = requests.first() else {
            return Ok(Vec::new());
        };

        let model = first.model.as_deref().unwrap_or(&self.model);
        let reply = self
            .call(&EmbeddingsBody {
                model,
                input: requests.iter().map(|r| r.text.as_str()).collect(),
                dimensions: first.dimensions,
            })
            .await?;

        if reply.data.len() != requests.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "asked for {} embeddings, got {}",
                requests.len(),
                reply.data.len()
            )));
        }

        let mut items = reply.data;
        items.sort_by_key(|item| item.index);
        debug!("Embedded batch of {} texts with {}", items.len(), reply.model);

        Ok(items
            .into_iter()
            .map(|item| EmbeddingResponse::new(item.embedding, reply.model.as_str(), None))
            .collect())
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAIProvider {
        OpenAIProvider::new()
            .with_api_key("test-key")
            .with_base_url(format!("{}/", server.uri()))
    }

    #[test]
    fn test_large_model_dimension() {
        let provider = OpenAIProvider::new().with_model("text-embedding-3-large");
        assert_eq!(provider.default_dimension(), 3072);
        assert_eq!(OpenAIProvider::new().default_dimension(), 1536);
    }

    #[tokio::test]
    async fn test_embed_sends_model_and_parses_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })))
            .mount(&server)
            .await;

        let response = provider(&server)
            .embed(EmbeddingRequest::new("hello").with_dimensions(3))
            .await
            .unwrap();

        assert_eq!(response.embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(response.dimension, 3);
        assert_eq!(response.tokens_used, Some(2));

        let sent = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&sent[0].body).unwrap();
        assert_eq!(
            body,
            json!({"model": "text-embedding-3-small", "input": ["hello"], "dimensions": 3})
        );
    }

    #[tokio::test]
    async fn test_batch_is_one_request_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"embedding": [2.0], "index": 1},
                    {"embedding": [1.0], "index": 0}
                ],
                "model": "text-embedding-3-small"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vectors: Vec<Embedding> = provider(&server)
            .embed_batch(vec![EmbeddingRequest::new("a"), EmbeddingRequest::new("b")])
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.embedding)
            .collect();

        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[tokio::test]
    async fn test_short_batch_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [1.0], "index": 0}],
                "model": "m"
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .embed_batch(vec![EmbeddingRequest::new("a"), EmbeddingRequest::new("b")])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer limited"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": {"message": "Incorrect API key"}})),
            )
            .mount(&server)
            .await;

        let limited = provider(&server)
            .with_api_key("limited")
            .embed(EmbeddingRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(
            limited,
            EmbeddingError::RateLimited {
                retry_after_secs: Some(7)
            }
        ));

        match provider(&server).embed(EmbeddingRequest::new("x")).await {
            Err(EmbeddingError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let provider = OpenAIProvider {
            api_key: None,
            ..OpenAIProvider::new().with_base_url("http://127.0.0.1:9")
        };

        assert!(!provider.is_available());
        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::NotConfigured));
    }
}
