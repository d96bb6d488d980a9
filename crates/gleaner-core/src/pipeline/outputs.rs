//! Typed step outputs.

use crate::domain::{META_CATEGORY, UNCATEGORIZED};
use crate::knowledge::KnowledgeEntry;
use serde::{Deserialize, Serialize};

/// Purpose of a user turn as classified.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Content,
    Greeting,
    ProactiveRequest,
    DontKnow,
}

impl Intent {
    /// Greetings and proactive requests carry no knowledge.
    pub fn is_conversational(self) -> bool {
        matches!(self, Self::Greeting | Self::ProactiveRequest)
    }
}

/// Output of the classifier step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_id: Option<String>,
    pub confidence: f64,
    pub intent: Intent,
    #[serde(default)]
    pub is_topic_change: bool,
    #[serde(default)]
    pub reasoning: String,
    /// Only set for uncategorized input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Only set for uncategorized input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category_label: Option<String>,
}

impl ClassifierResult {
    pub fn is_uncategorized(&self) -> bool {
        self.category_id == UNCATEGORIZED
    }

    pub fn is_meta(&self) -> bool {
        self.category_id == META_CATEGORY
    }
}

/// One entry found by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMatch {
    pub entry_id: String,
    pub title: String,
    pub category_id: String,
    pub score: f32,
    /// Whether the entry was collected in the current session
    pub same_session: bool,
}

/// Output of the context retriever step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextOutput {
    #[serde(default)]
    pub matches: Vec<ContextMatch>,
    /// Human-readable listing of matches, or why there are none
    pub summary: String,
}

impl ContextOutput {
    pub fn empty(summary: impl Into<String>) -> Self {
        Self {
            matches: Vec::new(),
            summary: summary.into(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GapMode {
    /// Gaps are schema-defined fields of a known category
    #[default]
    Structured,
    /// Gaps are free-form descriptors for uncategorized input
    Exploratory,
}

/// How likely the user can answer a question right away.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Answerability {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPurpose {
    #[default]
    FillGap,
    /// Asks whether the topic happens repeatedly
    Recurrence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub question: String,
    /// Field (or free-form gap) the question tries to fill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    #[serde(default)]
    pub answerability: Answerability,
    #[serde(default)]
    pub purpose: QuestionPurpose,
}

/// Output of the gap reasoner step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GapAnalysis {
    #[serde(default)]
    pub mode: GapMode,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub questions: Vec<FollowUpQuestion>,
    #[serde(default)]
    pub reasoning: String,
}

impl GapAnalysis {
    pub fn question_texts(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.question.clone()).collect()
    }

    /// Fields targeted by this turn's questions.
    pub fn targeted_fields(&self) -> Vec<String> {
        self.questions
            .iter()
            .filter_map(|q| q.target_field.clone())
            .collect()
    }
}

/// Output of the persona responder step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonaReply {
    pub response: String,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

/// Output of the structuring step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuringOutput {
    pub entry: KnowledgeEntry,
    /// Whether every required field of the category has a value
    pub is_complete: bool,
    #[serde(default)]
    pub missing_fields: Vec<String>,
}
