//! Turn-scoped accumulator.
//!
//! Steps never mutate the state they are given. Each step returns a
//! [`StepOutput`] and the orchestrator folds it in with [`PipelineState::apply`],
//! which only ever touches the field that belongs to that step.

use super::input::{AgentInput, TurnContext};
use super::outputs::{
    ClassifierResult, ContextOutput, GapAnalysis, Intent, PersonaReply, StructuringOutput,
};
use serde::{Deserialize, Serialize};

/// Identifies a pipeline step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    Classifier,
    ContextRetriever,
    GapReasoner,
    PersonaResponder,
    Structuring,
}

/// The partial result of a single step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Classifier(ClassifierResult),
    Context(ContextOutput),
    GapReasoning(GapAnalysis),
    Persona(PersonaReply),
    Structuring(StructuringOutput),
}

impl StepOutput {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Classifier(_) => StepKind::Classifier,
            Self::Context(_) => StepKind::ContextRetriever,
            Self::GapReasoning(_) => StepKind::GapReasoner,
            Self::Persona(_) => StepKind::PersonaResponder,
            Self::Structuring(_) => StepKind::Structuring,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub session_id: String,
    pub input: AgentInput,
    #[serde(default)]
    pub classifier_output: Option<ClassifierResult>,
    #[serde(default)]
    pub context_output: Option<ContextOutput>,
    #[serde(default)]
    pub gap_reasoning_output: Option<GapAnalysis>,
    #[serde(default)]
    pub persona_output: Option<PersonaReply>,
    #[serde(default)]
    pub structuring_output: Option<StructuringOutput>,
    /// Category the session was collecting before this turn
    #[serde(default)]
    pub active_category: Option<String>,
    pub turn_context: TurnContext,
    /// Steps that ran, in order
    #[serde(default)]
    pub executed_steps: Vec<StepKind>,
}

impl PipelineState {
    pub fn new(
        input: AgentInput,
        active_category: Option<String>,
        turn_context: TurnContext,
    ) -> Self {
        Self {
            session_id: input.session_id.clone(),
            input,
            classifier_output: None,
            context_output: None,
            gap_reasoning_output: None,
            persona_output: None,
            structuring_output: None,
            active_category,
            turn_context,
            executed_steps: Vec::new(),
        }
    }

    /// Folds one step's output into a new state.
    pub fn apply(mut self, output: StepOutput) -> Self {
        self.executed_steps.push(output.kind());
        match output {
            StepOutput::Classifier(o) => self.classifier_output = Some(o),
            StepOutput::Context(o) => self.context_output = Some(o),
            StepOutput::GapReasoning(o) => self.gap_reasoning_output = Some(o),
            StepOutput::Persona(o) => self.persona_output = Some(o),
            StepOutput::Structuring(o) => self.structuring_output = Some(o),
        }
        self
    }

    pub fn intent(&self) -> Option<Intent> {
        self.classifier_output.as_ref().map(|c| c.intent)
    }

    /// Category this turn is about: the classification, else the carried-in category.
    pub fn effective_category(&self) -> Option<&str> {
        self.classifier_output
            .as_ref()
            .map(|c| c.category_id.as_str())
            .or(self.active_category.as_deref())
    }

    pub fn has_executed(&self, step: StepKind) -> bool {
        self.executed_steps.contains(&step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(category_id: &str) -> ClassifierResult {
        ClassifierResult {
            category_id: category_id.to_string(),
            subcategory_id: None,
            confidence: 0.9,
            intent: Intent::Content,
            is_topic_change: false,
            reasoning: String::new(),
            summary: None,
            suggested_category_label: None,
        }
    }

    #[test]
    fn test_apply_sets_only_the_step_field() {
        let state = PipelineState::new(
            AgentInput::new("s1", "hello"),
            Some("history".to_string()),
            TurnContext::first_turn(),
        );
        let state = state
            .apply(StepOutput::Classifier(classification("nature")))
            .apply(StepOutput::Context(ContextOutput::empty("none")));

        assert_eq!(state.executed_steps, vec![StepKind::Classifier, StepKind::ContextRetriever]);
        assert!(state.gap_reasoning_output.is_none());
        assert!(state.structuring_output.is_none());
        assert_eq!(state.active_category.as_deref(), Some("history"));
        assert_eq!(state.effective_category(), Some("nature"));
    }

    #[test]
    fn test_step_kind_display_names() {
        assert_eq!(StepKind::GapReasoner.to_string(), "gap_reasoner");
        assert_eq!(Intent::ProactiveRequest.to_string(), "proactive_request");
    }
}
