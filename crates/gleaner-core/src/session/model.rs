//! Session domain model.

use crate::knowledge::KnowledgeEntry;
use crate::pipeline::{ClassifierResult, Intent, PipelineState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Complete,
    Abandoned,
}

/// What a caller supplies when opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Domain configuration name
    pub domain: String,
    /// Persona configuration name
    pub persona: String,
    /// Free-form caller attributes (e.g. interviewee, channel)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl SessionMetadata {
    pub fn new(domain: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            persona: persona.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// One processed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub turn_number: u32,
    pub input: String,
    /// Full pipeline state of the turn, kept for audit and for later turn contexts
    pub pipeline_result: PipelineState,
    /// Completeness of the session entry after this turn
    pub completeness: f64,
    /// Timestamp when the turn was recorded (ISO 8601 format)
    pub created_at: String,
}

impl Turn {
    pub fn intent(&self) -> Option<Intent> {
        self.pipeline_result.intent()
    }
}

/// An interview session.
///
/// Owns its turns. `current_entry` and `classifier_result` form the session's
/// aggregate state and only change on content turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    pub domain_config_name: String,
    pub persona_config_name: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub current_entry: Option<KnowledgeEntry>,
    #[serde(default)]
    pub classifier_result: Option<ClassifierResult>,
    #[serde(default)]
    pub metadata: SessionMetadata,
    /// Timestamp when the session was created (ISO 8601 format)
    pub created_at: String,
    /// Timestamp when the session was last updated (ISO 8601 format)
    pub updated_at: String,
}

impl Session {
    /// Creates an empty active session.
    pub fn new(metadata: SessionMetadata) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            domain_config_name: metadata.domain.clone(),
            persona_config_name: metadata.persona.clone(),
            status: SessionStatus::Active,
            turns: Vec::new(),
            current_entry: None,
            classifier_result: None,
            metadata,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Category the session is currently collecting.
    pub fn active_category(&self) -> Option<&str> {
        self.classifier_result
            .as_ref()
            .map(|c| c.category_id.as_str())
    }

    pub fn next_turn_number(&self) -> u32 {
        self.turns.last().map_or(1, |t| t.turn_number + 1)
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Returned by `init_session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitSessionResponse {
    pub session_id: String,
    pub greeting: String,
}

/// Returned for every processed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub turn_number: u32,
    pub response: String,
    pub follow_up_questions: Vec<String>,
    pub intent: Intent,
    /// Category the session is collecting after this turn
    pub category_id: Option<String>,
    pub is_topic_change: bool,
    pub current_entry: Option<KnowledgeEntry>,
    pub completeness: f64,
    pub is_complete: bool,
    pub status: SessionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active_and_empty() {
        let session = Session::new(SessionMetadata::new("local-history", "archivist"));
        assert!(session.is_active());
        assert_eq!(session.domain_config_name, "local-history");
        assert_eq!(session.persona_config_name, "archivist");
        assert_eq!(session.next_turn_number(), 1);
        assert!(session.active_category().is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(SessionStatus::Abandoned.to_string(), "abandoned");
        assert_eq!(
            serde_json::to_string(&SessionStatus::Complete).unwrap(),
            "\"complete\""
        );
    }
}
