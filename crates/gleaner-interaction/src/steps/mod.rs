//! The five pipeline steps.
//!
//! Each step reads the accumulated [`PipelineState`] and returns only its own
//! [`StepOutput`]. Steps hold no per-session state, so one instance serves
//! every session.

mod classifier;
mod context_retriever;
mod gap_reasoner;
mod persona_responder;
mod structuring;

pub use classifier::Classifier;
pub use context_retriever::ContextRetriever;
pub use gap_reasoner::GapReasoner;
pub use persona_responder::PersonaResponder;
pub use structuring::StructuringExtractor;

use crate::gateway::ModelGateway;
use crate::prompts::PromptLibrary;
use async_trait::async_trait;
use gleaner_core::config::PipelineSettings;
use gleaner_core::domain::DomainConfig;
use gleaner_core::error::Result;
use gleaner_core::persona::PersonaConfig;
use gleaner_core::pipeline::{PipelineState, StepKind, StepOutput, TurnSummary};
use gleaner_core::search::EmbeddingSearchClient;
use std::sync::Arc;

/// Number of earlier turns rendered into prompts.
const RECENT_TURNS: usize = 5;

/// Read-only configuration a step runs against.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub domain: &'a DomainConfig,
    pub persona: &'a PersonaConfig,
    pub settings: &'a PipelineSettings,
}

#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn kind(&self) -> StepKind;

    async fn run(&self, state: &PipelineState, ctx: &StepContext<'_>) -> Result<StepOutput>;
}

/// One instance of every step.
#[derive(Clone)]
pub struct PipelineSteps {
    pub classifier: Arc<dyn PipelineStep>,
    pub context_retriever: Arc<dyn PipelineStep>,
    pub gap_reasoner: Arc<dyn PipelineStep>,
    pub persona_responder: Arc<dyn PipelineStep>,
    pub structuring: Arc<dyn PipelineStep>,
}

impl PipelineSteps {
    /// The production steps: model-backed through `gateway`, with optional
    /// similarity search for context retrieval.
    pub fn model_backed(
        gateway: Arc<ModelGateway>,
        prompts: Arc<PromptLibrary>,
        search: Option<Arc<dyn EmbeddingSearchClient>>,
    ) -> Result<Self> {
        Ok(Self {
            classifier: Arc::new(Classifier::new(gateway.clone(), prompts.clone())?),
            context_retriever: Arc::new(ContextRetriever::new(search)),
            gap_reasoner: Arc::new(GapReasoner::new(gateway.clone(), prompts.clone())?),
            persona_responder: Arc::new(PersonaResponder::new(gateway.clone(), prompts.clone())?),
            structuring: Arc::new(StructuringExtractor::new(gateway, prompts)?),
        })
    }

    pub fn get(&self, kind: StepKind) -> &dyn PipelineStep {
        match kind {
            StepKind::Classifier => self.classifier.as_ref(),
            StepKind::ContextRetriever => self.context_retriever.as_ref(),
            StepKind::GapReasoner => self.gap_reasoner.as_ref(),
            StepKind::PersonaResponder => self.persona_responder.as_ref(),
            StepKind::Structuring => self.structuring.as_ref(),
        }
    }
}

fn recent_turns(state: &PipelineState) -> &[TurnSummary] {
    let turns = &state.turn_context.previous_turns;
    &turns[turns.len().saturating_sub(RECENT_TURNS)..]
}
