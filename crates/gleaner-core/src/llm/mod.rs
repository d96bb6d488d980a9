//! Language model client abstraction.
//!
//! The gateway only needs "send a prompt, get text back". Provider adapters
//! implement [`LanguageModelClient`] and report failures as [`ModelError`]s
//! flagged recoverable or not.

use crate::error::GleanerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A single model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub user_message: String,
    /// JSON Schema describing the expected output, if the caller has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_shape: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub text: String,
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            token_usage: None,
        }
    }
}

/// Failure reported by a model client.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ModelError {
    pub message: String,
    pub status_code: Option<u16>,
    /// Whether retrying the same request may succeed
    pub recoverable: bool,
    /// Provider-supplied delay before retrying
    pub retry_after: Option<Duration>,
}

const NETWORK_ERROR_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection",
    "network",
    "reset by peer",
    "broken pipe",
    "temporarily unavailable",
];

impl ModelError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            recoverable: true,
            retry_after: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            recoverable: false,
            retry_after: None,
        }
    }

    /// An HTTP failure; 429 and 5xx are recoverable.
    pub fn http(status_code: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
            recoverable: is_transient_status(status_code),
            retry_after,
        }
    }

    /// Whether the failure looks like a transient transport problem.
    ///
    /// Classified by status code (429/5xx) or, without one, by well-known
    /// network error substrings.
    pub fn is_transient(&self) -> bool {
        if !self.recoverable {
            return false;
        }
        match self.status_code {
            Some(code) => is_transient_status(code),
            None => {
                let message = self.message.to_lowercase();
                NETWORK_ERROR_MARKERS.iter().any(|m| message.contains(m))
            }
        }
    }
}

fn is_transient_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

impl From<ModelError> for GleanerError {
    fn from(err: ModelError) -> Self {
        GleanerError::model(err.message, err.status_code, err.recoverable)
    }
}

/// Sends prompts to a language model.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str {
        "model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_errors_are_classified_by_status() {
        assert!(ModelError::http(429, "slow down", None).is_transient());
        assert!(ModelError::http(503, "unavailable", None).is_transient());
        assert!(!ModelError::http(400, "bad request", None).is_transient());
        assert!(!ModelError::http(401, "bad key", None).recoverable);
    }

    #[test]
    fn test_network_errors_are_classified_by_message() {
        assert!(ModelError::recoverable("Connection reset by peer").is_transient());
        assert!(ModelError::recoverable("request timed out").is_transient());
        assert!(!ModelError::recoverable("quota exhausted").is_transient());
        assert!(!ModelError::fatal("connection refused").is_transient());
    }

    #[test]
    fn test_conversion_keeps_recoverability() {
        let err: GleanerError = ModelError::http(529, "overloaded", None).into();
        assert!(err.is_recoverable());
        let err: GleanerError = ModelError::fatal("invalid api key").into();
        assert!(!err.is_recoverable());
    }
}
