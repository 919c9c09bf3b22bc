//! Image generation and editing.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::http::{self, Endpoint};

/// Default model for text-to-image generation.
pub const DEFAULT_GENERATION_MODEL: &str = "dall-e-2";
/// Default output size for generation.
pub const DEFAULT_SIZE: &str = "256x256";
/// Default model for image edits.
pub const DEFAULT_EDIT_MODEL: &str = "gpt-image-1";

/// Text-to-image request.
#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub n: u32,
}

impl ImageGenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_GENERATION_MODEL.to_string(),
            size: DEFAULT_SIZE.to_string(),
            n: 1,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_count(mut self, n: u32) -> Self {
        self.n = n;
        self
    }
}

/// An in-memory source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// A PNG image.
    pub fn png(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: "image/png".to_string(),
            bytes,
        }
    }

    /// Decode a base64 payload, with or without a `data:<mime>;base64,` prefix.
    pub fn from_base64(file_name: impl Into<String>, data: &str) -> Result<Self> {
        let (mime_type, payload) = match data
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
        {
            Some((mime, payload)) => (mime.to_string(), payload),
            None => ("image/png".to_string(), data),
        };
        Ok(Self {
            file_name: file_name.into(),
            mime_type,
            bytes: BASE64_STANDARD.decode(payload.trim())?,
        })
    }
}

/// Instruction-driven edit of one or more images.
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    pub prompt: String,
    pub images: Vec<ImageInput>,
    pub model: String,
    pub size: Option<String>,
}

impl ImageEditRequest {
    pub fn new(prompt: impl Into<String>, images: Vec<ImageInput>) -> Self {
        Self {
            prompt: prompt.into(),
            images,
            model: DEFAULT_EDIT_MODEL.to_string(),
            size: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }
}

/// An image returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// Hosted image location.
    Url(String),
    /// Inline base64-encoded bytes.
    Base64(String),
}

impl GeneratedImage {
    /// Raw bytes of an inline image. Hosted images must be fetched instead.
    pub fn decode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Url(url) => Err(ClientError::InvalidInput(format!(
                "image is hosted at {url}, not inline"
            ))),
            Self::Base64(data) => Ok(BASE64_STANDARD.decode(data)?),
        }
    }

    /// Short description suitable for handing back to a language model.
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Base64(data) => format!("<base64 image, {} bytes encoded>", data.len()),
        }
    }
}

/// An image generation service.
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Generate images from a text prompt.
    async fn generate(&self, request: ImageGenerationRequest) -> Result<Vec<GeneratedImage>>;

    /// Edit the given images according to the prompt.
    async fn edit(&self, request: ImageEditRequest) -> Result<Vec<GeneratedImage>>;
}

/// Client for OpenAI-compatible `/images/*` endpoints.
#[derive(Clone)]
pub struct OpenAIImageClient {
    endpoint: Endpoint,
}

impl OpenAIImageClient {
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
}

impl Default for OpenAIImageClient {
    fn default() -> Self {
        Self::new()
    }
}

fn check_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(ClientError::InvalidInput("prompt cannot be empty".to_string()));
    }
    Ok(())
}

#[async_trait]
impl ImageClient for OpenAIImageClient {
    async fn generate(&self, request: ImageGenerationRequest) -> Result<Vec<GeneratedImage>> {
        check_prompt(&request.prompt)?;
        debug!("Generating {} image(s) with {}", request.n, request.model);

        let response =
            http::send(self.endpoint.post("images/generations")?.json(&request)).await?;
        let images = parse_images(response.json().await?)?;

        info!("Generated {} image(s)", images.len());
        Ok(images)
    }

    async fn edit(&self, request: ImageEditRequest) -> Result<Vec<GeneratedImage>> {
        check_prompt(&request.prompt)?;
        if request.images.is_empty() {
            return Err(ClientError::InvalidInput(
                "at least one image is required".to_string(),
            ));
        }
        debug!(
            "Editing {} image(s) with {}",
            request.images.len(),
            request.model
        );

        let field = if request.images.len() > 1 { "image[]" } else { "image" };
        let mut form = Form::new()
            .text("model", request.model)
            .text("prompt", request.prompt);
        if let Some(size) = request.size {
            form = form.text("size", size);
        }
        for image in request.images {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.mime_type)?;
            form = form.part(field, part);
        }

        let response = http::send(self.endpoint.post("images/edits")?.multipart(form)).await?;
        let images = parse_images(response.json().await?)?;

        info!("Edited into {} image(s)", images.len());
        Ok(images)
    }
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

fn parse_images(response: ImagesResponse) -> Result<Vec<GeneratedImage>> {
    let images: Vec<GeneratedImage> = response
        .data
        .into_iter()
        .filter_map(|d| match (d.b64_json, d.url) {
            (Some(b64), _) => Some(GeneratedImage::Base64(b64)),
            (None, Some(url)) => Some(GeneratedImage::Url(url)),
            (None, None) => None,
        })
        .collect();

    if images.is_empty() {
        return Err(ClientError::EmptyResponse);
    }
    Ok(images)
}
