//! Single-round tool-calling agent.
//!
//! The agent sends the prompt with every registered tool advertised. If the
//! model picks a tool, the agent runs it and asks the model once more with
//! the tool's output, returning that final answer.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use chatbot_client::{
    ChatMessage, CompletionClient, CompletionRequest, ImageClient, ToolCall, ToolChoice,
};

use crate::builtin::{CurrentTimeTool, EditImageTool, GenerateImageTool};
use crate::error::Result;
use crate::registry::ToolRegistry;

pub const DEFAULT_AGENT_MODEL: &str = "gpt-4o-mini";

pub const SYSTEM_PROMPT: &str = "You can generate images, edit images, or return the current time. \
     Decide the best tool or answer directly.";

pub const INVALID_ARGUMENTS: &str = "Invalid arguments for tool call.";

pub const NO_RESPONSE: &str = "No response from model.";

/// Routes a prompt to a tool or answers it directly.
pub struct ToolAgent {
    client: Arc<dyn CompletionClient>,
    registry: ToolRegistry,
    model: String,
}

impl ToolAgent {
    pub fn new(client: Arc<dyn CompletionClient>, registry: ToolRegistry) -> Self {
        Self {
            client,
            registry,
            model: DEFAULT_AGENT_MODEL.to_string(),
        }
    }

    /// Agent with `generate_image`, `edit_image` and `get_current_time`.
    pub fn with_default_tools(
        client: Arc<dyn CompletionClient>,
        images: Arc<dyn ImageClient>,
    ) -> Result<Self> {
        let registry = ToolRegistry::new()
            .with(Arc::new(GenerateImageTool::new(images.clone())))?
            .with(Arc::new(EditImageTool::new(images)))?
            .with(Arc::new(CurrentTimeTool::new()))?;
        Ok(Self::new(client, registry))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer `prompt`, calling at most one tool on the way.
    ///
    /// Never fails: model and tool errors come back as `Error: ...` text.
    pub async fn query(&self, prompt: &str) -> String {
        let first = CompletionRequest::new(
            self.model.clone(),
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
        )
        .with_tools(self.registry.openai_tools())
        .with_tool_choice(ToolChoice::Auto);

        let response = match self.client.complete(first).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Tool agent completion failed: {e}");
                return format!("Error: {e}");
            }
        };

        let Some(call) = response.tool_calls.first().cloned() else {
            debug!("Model answered without a tool");
            return response
                .content
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| NO_RESPONSE.to_string());
        };

        let args: Value = match serde_json::from_str(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!("Unparseable arguments for {}: {e}", call.function.name);
                return INVALID_ARGUMENTS.to_string();
            }
        };

        let result = self.run_tool(&call, args).await;
        self.follow_up(prompt, call, result).await
    }

    async fn run_tool(&self, call: &ToolCall, args: Value) -> String {
        let name = &call.function.name;
        let Some(tool) = self.registry.get(name) else {
            warn!("Model called unknown tool: {name}");
            return format!("Unknown tool called: {name}");
        };

        info!("Invoking tool {name}");
        match tool.invoke(args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool {name} failed: {e}");
                format!("Error: {e}")
            }
        }
    }

    /// Second round: the original prompt, the assistant's call, and its result.
    async fn follow_up(&self, prompt: &str, call: ToolCall, result: String) -> String {
        let call_id = call.id.clone();
        let request = CompletionRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::user(prompt),
                ChatMessage::assistant_tool_calls(None, vec![call]),
                ChatMessage::tool(call_id, result),
            ],
        );

        match self.client.complete(request).await {
            Ok(response) => response
                .content
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| NO_RESPONSE.to_string()),
            Err(e) => {
                warn!("Tool agent follow-up failed: {e}");
                format!("Error: {e}")
            }
        }
    }
}
