//! Application configuration.
//!
//! Loaded from TOML by the infrastructure layer. Every section defaults when
//! absent, so an empty file is a valid (if domain-less) configuration.

use crate::domain::DomainConfig;
use crate::persona::PersonaConfig;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default, rename = "domain")]
    pub domains: Vec<DomainConfig>,
    #[serde(default, rename = "persona")]
    pub personas: Vec<PersonaConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ModelSettings {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "claude".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
        }
    }
}

/// Retry budgets of the model invocation gateway.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GatewaySettings {
    /// Correction retries after invalid output (1 means 2 attempts)
    pub max_retries: u32,
    /// Backoff retries after transient transport failures
    pub transport_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            max_retries: 1,
            transport_retries: 2,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Upper bound on follow-up questions per turn
    pub max_questions: usize,
    /// Content classifications below this confidence become uncategorized
    pub uncategorized_confidence_threshold: f64,
    pub search_limit: usize,
    pub min_similarity: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_questions: 3,
            uncategorized_confidence_threshold: 0.6,
            search_limit: 5,
            min_similarity: 0.3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// Completeness at or above which a turn reports the entry as complete
    pub completion_threshold: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            completion_threshold: 0.9,
        }
    }
}
