//! Pipeline Orchestrator.
//!
//! Runs one turn: the classifier first, then the steps planned for the
//! classified intent, folding each step's output into the turn state.
//! Retries live in the gateway; a failing step aborts the turn.

use gleaner_core::error::{GleanerError, Result};
use gleaner_core::pipeline::{AgentInput, Intent, PipelineState, StepKind, TurnContext};
use gleaner_interaction::steps::{PipelineSteps, StepContext};
use tracing::{Instrument, debug, info, info_span, warn};

const CONVERSATIONAL_PLAN: &[StepKind] = &[StepKind::PersonaResponder];

const CONTENT_PLAN: &[StepKind] = &[
    StepKind::ContextRetriever,
    StepKind::GapReasoner,
    StepKind::PersonaResponder,
    StepKind::Structuring,
];

const DONT_KNOW_PLAN: &[StepKind] = &[
    StepKind::ContextRetriever,
    StepKind::GapReasoner,
    StepKind::PersonaResponder,
];

/// Steps that run after the classifier, in order, for a classified intent.
pub fn plan_for(intent: Intent) -> &'static [StepKind] {
    if intent.is_conversational() {
        return CONVERSATIONAL_PLAN;
    }
    match intent {
        Intent::DontKnow => DONT_KNOW_PLAN,
        _ => CONTENT_PLAN,
    }
}

pub struct PipelineOrchestrator {
    steps: PipelineSteps,
}

impl PipelineOrchestrator {
    pub fn new(steps: PipelineSteps) -> Self {
        Self { steps }
    }

    /// Executes one turn and returns its final state.
    pub async fn run_turn(
        &self,
        input: AgentInput,
        active_category: Option<String>,
        turn_context: TurnContext,
        ctx: &StepContext<'_>,
    ) -> Result<PipelineState> {
        let span = info_span!(
            "turn",
            session_id = %input.session_id,
            turn = turn_context.turn_number
        );

        async move {
            let state = PipelineState::new(input, active_category, turn_context);
            let mut state = self.execute(StepKind::Classifier, state, ctx).await?;

            let intent = state
                .intent()
                .ok_or_else(|| GleanerError::internal("classifier finished without a result"))?;
            for step in plan_for(intent) {
                state = self.execute(*step, state, ctx).await?;
            }

            info!(%intent, steps = ?state.executed_steps, "turn pipeline finished");
            Ok(state)
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        kind: StepKind,
        state: PipelineState,
        ctx: &StepContext<'_>,
    ) -> Result<PipelineState> {
        debug!(step = %kind, "running step");
        let output = self
            .steps
            .get(kind)
            .run(&state, ctx)
            .await
            .inspect_err(|e| warn!(step = %kind, "step failed, aborting turn: {e}"))?;

        if output.kind() != kind {
            return Err(GleanerError::internal(format!(
                "step {kind} returned output of {}",
                output.kind()
            )));
        }
        Ok(state.apply(output))
    }
}
