//! Error types for Gleaner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole Gleaner workspace.
///
/// Variants follow the failure taxonomy of a conversation turn: model output
/// that never met its contract, precondition and configuration failures,
/// transport failures (recoverable or not), lookups of unknown sessions and
/// operations on sessions that are no longer active.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum GleanerError {
    /// Model output never conformed to the expected shape within the retry budget
    #[error("Agent output invalid: {agent} ({} validation errors: {})", .errors.len(), .errors.join("; "))]
    AgentOutputInvalid { agent: String, errors: Vec<String> },

    /// A pipeline step ran without data it requires
    #[error("Precondition failed in {step}: {message}")]
    Precondition { step: String, message: String },

    /// Schema-valid model output referenced a category outside the configured set
    #[error("Unknown category '{category_id}' returned by {agent}")]
    UnknownCategory { agent: String, category_id: String },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure talking to the language model or another remote collaborator
    #[error("Model error{}: {message}", status_suffix(.status_code))]
    Model {
        message: String,
        status_code: Option<u16>,
        recoverable: bool,
    },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound { entity_type: String, id: String },

    /// Operation on a session that is no longer active
    #[error("Session '{id}' already {status}")]
    SessionNotActive { id: String, status: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Data access error (repository/storage layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GleanerError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Precondition error for the named step
    pub fn precondition(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Precondition {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Creates an AgentOutputInvalid error
    pub fn agent_output_invalid(agent: impl Into<String>, errors: Vec<String>) -> Self {
        Self::AgentOutputInvalid {
            agent: agent.into(),
            errors,
        }
    }

    /// Creates a Model error
    pub fn model(message: impl Into<String>, status_code: Option<u16>, recoverable: bool) -> Self {
        Self::Model {
            message: message.into(),
            status_code,
            recoverable,
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a validation failure of model output
    pub fn is_agent_output_invalid(&self) -> bool {
        matches!(self, Self::AgentOutputInvalid { .. })
    }

    /// Check if the operation targeted a non-active session
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, Self::SessionNotActive { .. })
    }

    /// Whether the caller may retry the whole turn.
    ///
    /// Only recoverable model/transport failures qualify. Everything else means
    /// the input or session cannot proceed as-is.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Model { recoverable: true, .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for GleanerError {
    fn from(err: std::io::Error) -> Self {
        Self::DataAccess(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for GleanerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GleanerError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for GleanerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

fn status_suffix(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!(" (status {code})"))
        .unwrap_or_default()
}

/// A type alias for `Result<T, GleanerError>`.
pub type Result<T> = std::result::Result<T, GleanerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_only_for_recoverable_model_errors() {
        assert!(GleanerError::model("rate limited", Some(429), true).is_recoverable());
        assert!(!GleanerError::model("bad key", Some(401), false).is_recoverable());
        assert!(!GleanerError::config("no categories").is_recoverable());
        assert!(!GleanerError::not_found("Session", "abc").is_recoverable());
    }

    #[test]
    fn test_agent_output_invalid_message_lists_errors() {
        let err = GleanerError::agent_output_invalid(
            "classifier",
            vec!["/intent: missing".to_string(), "/confidence: > 1".to_string()],
        );
        let message = err.to_string();
        assert!(message.contains("classifier"));
        assert!(message.contains("/intent: missing"));
        assert!(message.contains("/confidence: > 1"));
    }

    #[test]
    fn test_model_error_message_includes_status() {
        let err = GleanerError::model("overloaded", Some(529), true);
        assert_eq!(err.to_string(), "Model error (status 529): overloaded");
        let err = GleanerError::model("connection reset", None, true);
        assert_eq!(err.to_string(), "Model error: connection reset");
    }
}
