use super::outputs::Intent;
use crate::knowledge::KnowledgeEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw input of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInput {
    pub session_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AgentInput {
    pub fn new(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Compact record of an earlier turn, as seen by later turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub turn_number: u32,
    pub input: String,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub filled_fields: Vec<String>,
    /// Questions surfaced to the user in that turn
    #[serde(default)]
    pub asked_questions: Vec<String>,
    /// Fields those questions were aiming at
    #[serde(default)]
    pub targeted_fields: Vec<String>,
}

/// Conversational memory handed to the pipeline.
///
/// Built fresh by the session before each turn. Steps only read it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TurnContext {
    pub turn_number: u32,
    pub is_follow_up: bool,
    #[serde(default)]
    pub previous_turns: Vec<TurnSummary>,
    #[serde(default)]
    pub previous_entry: Option<KnowledgeEntry>,
    /// Every question asked so far in the session, oldest first
    #[serde(default)]
    pub asked_questions: Vec<String>,
    /// Fields the user deflected with "I don't know"
    #[serde(default)]
    pub skipped_fields: Vec<String>,
}

impl TurnContext {
    /// Context of the first turn of a session.
    pub fn first_turn() -> Self {
        Self {
            turn_number: 1,
            ..Self::default()
        }
    }

    /// The most recent question put to the user, if any.
    pub fn last_asked_question(&self) -> Option<&str> {
        self.previous_turns
            .iter()
            .rev()
            .find_map(|t| t.asked_questions.last())
            .map(String::as_str)
    }

    pub fn was_asked(&self, question: &str) -> bool {
        let needle = normalize_question(question);
        self.asked_questions
            .iter()
            .any(|q| normalize_question(q) == needle)
    }
}

fn normalize_question(question: &str) -> String {
    question
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
