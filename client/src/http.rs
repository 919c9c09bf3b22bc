//! Shared plumbing for the OpenAI-compatible endpoints.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::warn;

use crate::error::{ClientError, Result};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Endpoint location and credentials.
#[derive(Clone)]
pub(crate) struct Endpoint {
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: String,
    pub(crate) client: reqwest::Client,
}

impl Endpoint {
    /// Key from `OPENAI_API_KEY`, base URL from `OPENAI_BASE_URL` or the public API.
    pub(crate) fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .ok()
                .filter(|u| !u.is_empty())
                .map_or_else(|| DEFAULT_BASE_URL.to_string(), |u| trim_base_url(&u)),
            client: reqwest::Client::new(),
        }
    }

    /// Authorized POST to `{base_url}/{path}`.
    pub(crate) fn post(&self, path: &str) -> Result<RequestBuilder> {
        let api_key = self.api_key.as_ref().ok_or(ClientError::NotConfigured)?;
        Ok(self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(api_key))
    }
}

pub(crate) fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Send the request and turn non-success statuses into typed errors.
pub(crate) async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());
    let body = response.text().await.unwrap_or_default();

    let error = map_http_error(status, &body, retry_after_secs);
    warn!("Model API call failed: {error}");
    Err(error)
}

fn map_http_error(status: StatusCode, body: &str, retry_after_secs: Option<u64>) -> ClientError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited {
            retry_after_secs,
            message,
        },
        StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
        _ => ClientError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
