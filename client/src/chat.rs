//! Chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chatbot_conversation::{Role, Turn};

use crate::error::{ClientError, Result};
use crate::http::{self, Endpoint};

/// Sender of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::System => Self::System,
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id, echoed back in the tool result message.
    pub id: String,

    /// Always `"function"`.
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,

    /// The function and its JSON-encoded arguments.
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Function name plus raw argument JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// One message of a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,

    /// Text content; `None` only for assistant messages that carry tool calls.
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, content)
    }

    /// An assistant message that requested tool calls.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// The result of running a tool call.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self::text(turn.role.into(), turn.content.clone())
    }
}

/// How the model may use the offered tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

/// Body of a `/chat/completions` call.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tool definitions in OpenAI function format.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            tools: Vec::new(),
            tool_choice: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// The first choice of a completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub model: String,
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// The text content, or [`ClientError::EmptyResponse`] when the message
    /// carried none. An empty string is a valid answer.
    pub fn into_text(self) -> Result<String> {
        self.content.ok_or(ClientError::EmptyResponse)
    }
}

/// A chat completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAIChatClient {
    endpoint: Endpoint,
}

impl OpenAIChatClient {
    /// Configure from `OPENAI_API_KEY` and `OPENAI_BASE_URL`.
    pub fn new() -> Self {
        Self {
            endpoint: Endpoint::from_env(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.endpoint.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint.base_url = http::trim_base_url(&url.into());
        self
    }

    /// Whether an API key is available.
    pub fn is_configured(&self) -> bool {
        self.endpoint.api_key.is_some()
    }
}

impl Default for OpenAIChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for OpenAIChatClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            "Completion with {}: {} messages, {} tools",
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        let response = http::send(self.endpoint.post("chat/completions")?.json(&request)).await?;
        let parsed: ChatCompletionResponse = response.json().await?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ClientError::EmptyResponse)?;

        Ok(CompletionResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls,
            model: parsed.model.unwrap_or(request.model),
            usage: parsed.usage,
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAIChatClient {
        OpenAIChatClient::new()
            .with_api_key("test-key")
            .with_base_url(format!("{}/", server.uri()))
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "gpt-4o-mini",
            vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
        )
        .with_max_tokens(500)
    }

    #[test]
    fn test_request_wire_format() {
        let body = serde_json::to_value(
            request()
                .with_tools(vec![json!({"type": "function"})])
                .with_tool_choice(ToolChoice::Auto),
        )
        .unwrap();

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ],
                "max_tokens": 500,
                "tools": [{"type": "function"}],
                "tool_choice": "auto"
            })
        );
    }

    #[test]
    fn test_tool_messages_wire_format() {
        let call = ToolCall {
            id: "call_1".to_string(),
            kind: function_type(),
            function: FunctionCall {
                name: "get_current_time".to_string(),
                arguments: "{}".to_string(),
            },
        };
        let assistant = serde_json::to_value(ChatMessage::assistant_tool_calls(None, vec![call])).unwrap();
        assert_eq!(assistant["content"], serde_json::Value::Null);
        assert_eq!(assistant["tool_calls"][0]["type"], "function");

        let tool = serde_json::to_value(ChatMessage::tool("call_1", "12:00")).unwrap();
        assert_eq!(tool, json!({"role": "tool", "content": "12:00", "tool_call_id": "call_1"}));
    }

    #[test]
    fn test_turn_conversion() {
        let message = ChatMessage::from(&Turn::assistant("yes"));
        assert_eq!(message, ChatMessage::assistant("yes"));
    }

    #[tokio::test]
    async fn test_complete_parses_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "max_tokens": 500})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-mini-2024",
                "choices": [{"message": {"role": "assistant", "content": "Hello!"}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).complete(request()).await.unwrap();
        assert_eq!(response.model, "gpt-4o-mini-2024");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(12));
        assert_eq!(response.into_text().unwrap(), "Hello!");
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "generate_image", "arguments": "{\"prompt\":\"otter\"}"}
                    }]
                }}]
            })))
            .mount(&server)
            .await;

        let response = client(&server).complete(request()).await.unwrap();
        assert_eq!(response.content, None);
        assert_eq!(response.tool_calls[0].function.name, "generate_image");
        assert_eq!(response.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_status_codes_map_to_variants() {
        let server = MockServer::start().await;
        for (status, body) in [
            (429, json!({"error": {"message": "quota"}})),
            (400, json!({"error": {"message": "safety system"}})),
            (500, json!({"error": {"message": "oops"}})),
        ] {
            server.reset().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(status)
                        .insert_header("retry-after", "3")
                        .set_body_json(body),
                )
                .mount(&server)
                .await;

            let err = client(&server).complete(request()).await.unwrap_err();
            match status {
                429 => assert!(matches!(
                    err,
                    ClientError::RateLimited { retry_after_secs: Some(3), .. }
                )),
                400 => assert!(matches!(err, ClientError::BadRequest(ref m) if m == "safety system")),
                _ => assert!(matches!(err, ClientError::Api { status: 500, .. })),
            }
        }
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyResponse));
    }

    #[test]
    fn test_into_text_keeps_empty_content() {
        let empty = CompletionResponse {
            content: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(empty.into_text().unwrap(), "");

        let missing = CompletionResponse::default();
        assert!(matches!(
            missing.into_text(),
            Err(ClientError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        let mut client = client(&server);
        client.endpoint.api_key = None;

        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotConfigured));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
