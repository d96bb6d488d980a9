//! Versioned storage DTOs.
//!
//! Every persisted entity has a `V<major>_<minor>_<patch>` DTO per schema
//! version and a migrator that carries old documents up to the domain model.

pub mod knowledge;
pub mod session;

pub use knowledge::{KnowledgeRecordV1_0_0, create_knowledge_migrator};
pub use session::{SessionV1_0_0, create_session_migrator};
