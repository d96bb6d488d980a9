//! ClaudeApiClient - Language model client over the Claude Messages API.

use async_trait::async_trait;
use gleaner_core::config::ModelSettings;
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::llm::{LanguageModelClient, ModelError, ModelRequest, ModelResponse, TokenUsage};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client implementation that talks to the Claude HTTP API.
#[derive(Clone)]
pub struct ClaudeApiClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl ClaudeApiClient {
    /// Creates a new client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Builds a client from `[model]` settings, reading the API key from the
    /// environment variable they name.
    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        let api_key = env::var(&settings.api_key_env).map_err(|_| {
            GleanerError::config(format!(
                "{} is not set; export your Anthropic API key",
                settings.api_key_env
            ))
        })?;
        let model = if settings.model.is_empty() {
            DEFAULT_CLAUDE_MODEL
        } else {
            settings.model.as_str()
        };
        Ok(Self::new(api_key, model).with_max_tokens(settings.max_tokens))
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Points the client at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send_request(&self, body: &CreateMessageRequest) -> std::result::Result<ModelResponse, ModelError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Claude error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: CreateMessageResponse = response
            .json()
            .await
            .map_err(|err| ModelError::fatal(format!("Failed to parse Claude response: {err}")))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl LanguageModelClient for ClaudeApiClient {
    async fn invoke(&self, request: ModelRequest) -> std::result::Result<ModelResponse, ModelError> {
        let request = CreateMessageRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.user_message,
            }],
            max_tokens: self.max_tokens,
            system: system_prompt(request.system_prompt, request.output_shape.as_ref()),
        };

        self.send_request(&request).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Appends the output-shape hint to the system prompt.
fn system_prompt(system: String, output_shape: Option<&serde_json::Value>) -> Option<String> {
    let system = match output_shape {
        Some(shape) => format!(
            "{system}\n\nYour reply must be a single JSON value conforming to this JSON Schema:\n{shape}"
        ),
        None => system,
    };
    (!system.trim().is_empty()).then_some(system)
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> std::result::Result<ModelResponse, ModelError> {
    let token_usage = response.usage.map(|u| TokenUsage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
    });
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .map(|text| ModelResponse { text, token_usage })
        .ok_or_else(|| ModelError::fatal("Claude API returned no text in the response content"))
}

fn map_request_error(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::recoverable(format!("Claude API request timed out: {err}"))
    } else if err.is_connect() {
        ModelError::recoverable(format!("Claude API connection failed: {err}"))
    } else {
        ModelError::fatal(format!("Claude API request failed: {err}"))
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> ModelError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    ModelError::http(status.as_u16(), message, retry_after)
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
