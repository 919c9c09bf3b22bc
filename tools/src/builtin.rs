//! Built-in tools: image generation, image editing, current time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use chatbot_client::{
    ClientError, GeneratedImage, ImageClient, ImageEditRequest, ImageGenerationRequest, ImageInput,
};

use crate::error::{Result, ToolError};
use crate::spec::{DataType, ToolDefinition, ToolInput};
use crate::tool::{Tool, check_args, string_arg};

/// Turn image service failures into messages a user can act on.
fn explain(error: ClientError) -> ToolError {
    warn!("Image request failed: {error}");
    match error {
        ClientError::BadRequest(details) => ToolError::ExecutionFailed(format!(
            "Your request was rejected. This might be due to a safety policy violation. \
             Please modify your prompt. (Details: {details})"
        )),
        ClientError::RateLimited { .. } => ToolError::ExecutionFailed(
            "You have exceeded your API usage limit. Please check your OpenAI account."
                .to_string(),
        ),
        other => ToolError::Client(other),
    }
}

fn first_image(images: Vec<GeneratedImage>) -> Result<GeneratedImage> {
    images
        .into_iter()
        .next()
        .ok_or(ToolError::Client(ClientError::EmptyResponse))
}

/// `generate_image { prompt }`.
pub struct GenerateImageTool {
    client: Arc<dyn ImageClient>,
    definition: ToolDefinition,
}

impl GenerateImageTool {
    pub fn new(client: Arc<dyn ImageClient>) -> Self {
        Self {
            client,
            definition: ToolDefinition::new("generate_image", "Generate an image from text prompt")
                .with_input(ToolInput::required(
                    "prompt",
                    DataType::String,
                    "Prompt to generate an image",
                )),
        }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        check_args(&self.definition, &args)?;
        let prompt = string_arg(&args, "prompt")?;

        let images = self
            .client
            .generate(ImageGenerationRequest::new(prompt))
            .await
            .map_err(explain)?;
        let image = first_image(images)?;

        debug!("generate_image produced {}", image.describe());
        Ok(format!("Image generated successfully: {}", image.describe()))
    }
}

/// `edit_image { prompt, images }` with base64 or data-URL images.
pub struct EditImageTool {
    client: Arc<dyn ImageClient>,
    definition: ToolDefinition,
}

impl EditImageTool {
    pub fn new(client: Arc<dyn ImageClient>) -> Self {
        Self {
            client,
            definition: ToolDefinition::new(
                "edit_image",
                "Edit an existing image based on a text prompt",
            )
            .with_input(ToolInput::required(
                "prompt",
                DataType::String,
                "Editing instructions",
            ))
            .with_input(
                ToolInput::required(
                    "images",
                    DataType::String,
                    "Base64-encoded image(s) to edit",
                )
                .or(DataType::Array)
                .with_items(DataType::String),
            ),
        }
    }
}

#[async_trait]
impl Tool for EditImageTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        check_args(&self.definition, &args)?;
        let prompt = string_arg(&args, "prompt")?;

        let encoded: Vec<&str> = match &args["images"] {
            Value::String(single) => vec![single.as_str()],
            Value::Array(many) => many.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        let images = encoded
            .iter()
            .enumerate()
            .map(|(i, data)| ImageInput::from_base64(format!("image-{i}.png"), data))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let edited = self
            .client
            .edit(ImageEditRequest::new(prompt, images))
            .await
            .map_err(explain)?;
        let image = first_image(edited)?;

        Ok(format!("Image edited successfully: {}", image.describe()))
    }
}

/// `get_current_time {}`: UTC now, RFC 3339.
pub struct CurrentTimeTool {
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    definition: ToolDefinition,
}

impl CurrentTimeTool {
    /// Read the system clock.
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Read time from `clock` instead of the system.
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            definition: ToolDefinition::new("get_current_time", "Get the current UTC time"),
        }
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, _args: Value) -> Result<String> {
        Ok((self.clock)().to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}
