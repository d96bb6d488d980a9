//! Per-turn pipeline data.
//!
//! # Module Structure
//!
//! - `input`: immutable turn input and the conversational memory built before a turn
//! - `outputs`: typed partial results produced by each step
//! - `state`: the accumulator folded across steps

mod input;
mod outputs;
mod state;

pub use input::{AgentInput, TurnContext, TurnSummary};
pub use outputs::{
    Answerability, ClassifierResult, ContextMatch, ContextOutput, FollowUpQuestion, GapAnalysis,
    GapMode, Intent, PersonaReply, QuestionPurpose, StructuringOutput,
};
pub use state::{PipelineState, StepKind, StepOutput};
