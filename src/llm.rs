//! Language-model client for the Anthropic Messages API.
//!
//! One request per question, no retries. Every failure is classified into a
//! [`ModelError`] whose `Display` text is safe to show to the operator:
//!
//! | Variant | Cause |
//! |---------|-------|
//! | `NotConfigured` | no API key |
//! | `Timeout` | request exceeded the configured timeout |
//! | `Network` | connection or transport failure |
//! | `Api` | non-2xx status (body truncated to 200 chars) |
//! | `EmptyResponse` | 2xx with no `content` blocks |
//! | `Malformed` | 2xx body that is not the expected shape |

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::Config;
use crate::context::truncate_chars;

/// Header value sent as `anthropic-version`.
pub const API_VERSION: &str = "2023-06-01";

/// Maximum characters of an error body surfaced to the user.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Language model API not configured")]
    NotConfigured,
    #[error("Request timed out. Please try again.")]
    Timeout,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Model API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Model returned an empty response")]
    EmptyResponse,
    #[error("Unexpected response from model API: {0}")]
    Malformed(String),
}

impl ModelError {
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Timeout
        } else {
            ModelError::Network(err.to_string())
        }
    }

    pub(crate) fn api(status: u16, body: &str) -> Self {
        let body = if body.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            truncate_chars(body, ERROR_BODY_LIMIT)
        };
        ModelError::Api { status, body }
    }
}

/// A remote model that answers one question under a system instruction.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, system: &str, question: &str) -> Result<String, ModelError>;
}

pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            max_tokens,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.model.base_url.clone(),
            config.credentials.model_api_key.clone(),
            config.model.model.clone(),
            config.model.max_tokens,
            Duration::from_secs(config.model.timeout_secs),
        )
    }

    fn payload(&self, system: &str, question: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [{ "role": "user", "content": question }],
        })
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, system: &str, question: &str) -> Result<String, ModelError> {
        let Some(api_key) = &self.api_key else {
            return Err(ModelError::NotConfigured);
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("Content-Type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.payload(system, question))
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ModelError::from_transport)?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "model API returned an error");
            return Err(ModelError::api(status.as_u16(), &body));
        }

        parse_completion(&body)
    }
}

/// Extract `content[0].text` from a Messages API success body.
pub fn parse_completion(body: &str) -> Result<String, ModelError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| ModelError::Malformed(e.to_string()))?;

    let blocks = match json.get("content") {
        None | Some(Value::Null) => return Err(ModelError::EmptyResponse),
        Some(Value::Array(blocks)) => blocks,
        Some(_) => return Err(ModelError::Malformed("content is not an array".to_string())),
    };

    let first = blocks.first().ok_or(ModelError::EmptyResponse)?;
    first
        .get("text")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| ModelError::Malformed("first content block has no text".to_string()))
}
