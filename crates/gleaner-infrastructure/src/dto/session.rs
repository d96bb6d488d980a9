//! Session DTOs and migrations

use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, MigrationError, Migrator, Versioned};

use gleaner_core::knowledge::KnowledgeEntry;
use gleaner_core::pipeline::ClassifierResult;
use gleaner_core::session::{Session, SessionMetadata, SessionStatus, Turn};

/// V1.0.0: Initial session schema.
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct SessionV1_0_0 {
    /// Unique session identifier (UUID format).
    pub id: String,
    pub domain_config_name: String,
    pub persona_config_name: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_entry: Option<KnowledgeEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_result: Option<ClassifierResult>,
    #[serde(default)]
    pub metadata: SessionMetadata,
    /// Timestamp when the session was created (ISO 8601 format).
    pub created_at: String,
    /// Timestamp when the session was last updated (ISO 8601 format).
    pub updated_at: String,
}

impl IntoDomain<Session> for SessionV1_0_0 {
    fn into_domain(self) -> Session {
        Session {
            id: self.id,
            domain_config_name: self.domain_config_name,
            persona_config_name: self.persona_config_name,
            status: self.status,
            turns: self.turns,
            current_entry: self.current_entry,
            classifier_result: self.classifier_result,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl FromDomain<Session> for SessionV1_0_0 {
    fn from_domain(session: Session) -> Self {
        let Session {
            id,
            domain_config_name,
            persona_config_name,
            status,
            turns,
            current_entry,
            classifier_result,
            metadata,
            created_at,
            updated_at,
        } = session;

        SessionV1_0_0 {
            id,
            domain_config_name,
            persona_config_name,
            status,
            turns,
            current_entry,
            classifier_result,
            metadata,
            created_at,
            updated_at,
        }
    }
}

/// Creates a Migrator for Session entities.
///
/// # Migration Path
///
/// - V1.0.0 → Session
pub fn create_session_migrator() -> Result<Migrator, MigrationError> {
    let mut migrator = Migrator::builder().build();

    let session_path = Migrator::define("session")
        .from::<SessionV1_0_0>()
        .into_with_save::<Session>();
    migrator.register(session_path)?;

    Ok(migrator)
}
