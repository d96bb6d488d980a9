//! Model Invocation Gateway.
//!
//! The single place where model unreliability is absorbed. Transient
//! transport failures are retried with backoff, any other recoverable failure
//! spends one attempt, and output that cannot be parsed or does not match its
//! contract is retried with a correction appended to the prompt listing what
//! was wrong.

use crate::contract::OutputContract;
use crate::json_extract::extract_json;
use crate::retry::RetryPolicy;
use gleaner_core::config::GatewaySettings;
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::llm::{LanguageModelClient, ModelError, ModelRequest};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// System and user text of a step prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system_prompt: String,
    pub user_message: String,
}

pub struct ModelGateway {
    client: Arc<dyn LanguageModelClient>,
    max_retries: u32,
    transport: RetryPolicy,
}

impl ModelGateway {
    pub fn new(client: Arc<dyn LanguageModelClient>) -> Self {
        Self::from_settings(client, &GatewaySettings::default())
    }

    pub fn from_settings(client: Arc<dyn LanguageModelClient>, settings: &GatewaySettings) -> Self {
        Self {
            client,
            max_retries: settings.max_retries,
            transport: RetryPolicy::from_settings(settings),
        }
    }

    /// Sets how many times invalid output is retried with a correction.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_transport_policy(mut self, policy: RetryPolicy) -> Self {
        self.transport = policy;
        self
    }

    /// Invokes the model and returns output that satisfies `contract`.
    ///
    /// Makes at most `max_retries + 1` attempts. Non-recoverable model
    /// failures propagate at once. When the last attempt failed in transport
    /// that failure is returned, still recoverable; otherwise exhausted
    /// attempts fail with [`GleanerError::AgentOutputInvalid`] carrying the
    /// last validation errors.
    pub async fn invoke_and_validate<T: DeserializeOwned>(
        &self,
        agent: &str,
        prompt: &Prompt,
        contract: &OutputContract,
    ) -> Result<T> {
        let mut errors: Vec<String> = Vec::new();
        let mut last_failure: Option<ModelError> = None;

        for attempt in 1..=self.max_retries + 1 {
            let user_message = if errors.is_empty() {
                prompt.user_message.clone()
            } else {
                with_correction(&prompt.user_message, &errors)
            };
            let request = ModelRequest {
                system_prompt: prompt.system_prompt.clone(),
                user_message,
                output_shape: Some(contract.schema().clone()),
            };

            let response = match self
                .transport
                .run(agent, || self.client.invoke(request.clone()))
                .await
            {
                Ok(response) => response,
                Err(err) if !err.recoverable => return Err(err.into()),
                Err(err) => {
                    warn!(agent, attempt, "recoverable model failure: {}", err.message);
                    last_failure = Some(err);
                    continue;
                }
            };
            last_failure = None;

            if let Some(usage) = response.token_usage {
                debug!(
                    agent,
                    attempt,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "model call completed"
                );
            }

            errors = match extract_json(&response.text) {
                None => vec!["(root): response did not contain a JSON value".to_string()],
                Some(value) => {
                    let violations = contract.violations(&value);
                    if violations.is_empty() {
                        match serde_json::from_value::<T>(value) {
                            Ok(parsed) => return Ok(parsed),
                            Err(e) => vec![format!("(root): {e}")],
                        }
                    } else {
                        violations
                    }
                }
            };

            warn!(
                agent,
                attempt,
                errors = errors.len(),
                "model output rejected: {}",
                errors.join("; ")
            );
        }

        match last_failure {
            Some(err) => Err(err.into()),
            None => Err(GleanerError::agent_output_invalid(agent, errors)),
        }
    }
}

fn with_correction(user_message: &str, errors: &[String]) -> String {
    let listed = errors
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{user_message}\n\n## Correction\n\
         Your previous response was rejected:\n{listed}\n\n\
         Respond again with ONLY a JSON value that satisfies the output schema."
    )
}
