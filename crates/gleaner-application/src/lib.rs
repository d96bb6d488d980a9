//! Application layer: turn orchestration and the session state machine.

pub mod orchestrator;
pub mod session;

pub use orchestrator::{PipelineOrchestrator, plan_for};
pub use session::SessionService;
