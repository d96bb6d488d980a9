//! Session State Machine.
//!
//! # Module Structure
//!
//! - `memory`: builds a turn's conversational memory from earlier turns
//! - `service`: session lifecycle operations wrapping the orchestrator

mod memory;
mod service;

pub use memory::{build_turn_context, summarize_turn};
pub use service::SessionService;
