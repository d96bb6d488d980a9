//! Interview session module.
//!
//! # Module Structure
//!
//! - `model`: `Session`, `Turn` and the plain response types returned to callers
//! - `repository`: persistence trait for sessions

mod model;
mod repository;

pub use model::{
    InitSessionResponse, Session, SessionMetadata, SessionResponse, SessionStatus, Turn,
};
pub use repository::SessionRepository;
