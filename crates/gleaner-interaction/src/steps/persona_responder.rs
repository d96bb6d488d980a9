use super::{PipelineStep, StepContext, recent_turns};
use crate::contract::OutputContract;
use crate::gateway::ModelGateway;
use crate::prompts::PromptLibrary;
use async_trait::async_trait;
use gleaner_core::error::Result;
use gleaner_core::pipeline::{PersonaReply, PipelineState, StepKind, StepOutput};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// Speaks to the user in the persona's voice.
pub struct PersonaResponder {
    gateway: Arc<ModelGateway>,
    prompts: Arc<PromptLibrary>,
    contract: OutputContract,
}

impl PersonaResponder {
    pub fn new(gateway: Arc<ModelGateway>, prompts: Arc<PromptLibrary>) -> Result<Self> {
        Ok(Self {
            gateway,
            prompts,
            contract: OutputContract::new(output_schema())?,
        })
    }
}

fn output_schema() -> Value {
    json!({
        "type": "object",
        "required": ["response"],
        "properties": {
            "response": {"type": "string", "minLength": 1},
            "follow_up_questions": {"type": "array", "items": {"type": "string"}}
        }
    })
}

#[async_trait]
impl PipelineStep for PersonaResponder {
    fn kind(&self) -> StepKind {
        StepKind::PersonaResponder
    }

    async fn run(&self, state: &PipelineState, ctx: &StepContext<'_>) -> Result<StepOutput> {
        let questions = state
            .gap_reasoning_output
            .as_ref()
            .map(|g| g.question_texts())
            .unwrap_or_default();
        let category_labels: Vec<&str> =
            ctx.domain.categories.iter().map(|c| c.label.as_str()).collect();

        let prompt = self.prompts.render_step(
            StepKind::PersonaResponder,
            json!({
                "domain": ctx.domain,
                "persona": ctx.persona,
                "speaker_name": ctx.persona.speaker_name(),
                "intent": state.intent(),
                "category_labels": category_labels,
                "questions": questions,
                "max_questions": ctx.settings.max_questions,
                "recent_turns": recent_turns(state),
                "input": state.input.content,
            }),
        )?;

        let raw: PersonaReply = self
            .gateway
            .invoke_and_validate(&self.kind().to_string(), &prompt, &self.contract)
            .await?;
        let reply = keep_planned_questions(raw, &questions, ctx.settings.max_questions);

        debug!(
            session_id = %state.session_id,
            follow_ups = reply.follow_up_questions.len(),
            "persona replied"
        );
        Ok(StepOutput::Persona(reply))
    }
}

/// Only questions the gap reasoner proposed are surfaced, in its wording.
fn keep_planned_questions(raw: PersonaReply, planned: &[String], max_questions: usize) -> PersonaReply {
    let normalize = |s: &str| s.trim().trim_end_matches('?').trim().to_lowercase();
    let mut follow_up_questions: Vec<String> = Vec::new();

    for asked in &raw.follow_up_questions {
        let key = normalize(asked);
        if let Some(planned) = planned.iter().find(|p| normalize(p) == key) {
            if !follow_up_questions.contains(planned) {
                follow_up_questions.push(planned.clone());
            }
        }
    }
    follow_up_questions.truncate(max_questions);

    PersonaReply {
        response: raw.response.trim().to_string(),
        follow_up_questions,
    }
}
