//! Knowledge record DTOs and migrations

use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, MigrationError, Migrator, Versioned};

use gleaner_core::knowledge::{KnowledgeEntry, KnowledgeRecord};

/// V1.0.0: An entry stored together with the session and domain it came from.
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct KnowledgeRecordV1_0_0 {
    pub entry: KnowledgeEntry,
    pub session_id: String,
    pub domain_name: String,
}

impl IntoDomain<KnowledgeRecord> for KnowledgeRecordV1_0_0 {
    fn into_domain(self) -> KnowledgeRecord {
        KnowledgeRecord {
            entry: self.entry,
            session_id: self.session_id,
            domain_name: self.domain_name,
        }
    }
}

impl FromDomain<KnowledgeRecord> for KnowledgeRecordV1_0_0 {
    fn from_domain(record: KnowledgeRecord) -> Self {
        KnowledgeRecordV1_0_0 {
            entry: record.entry,
            session_id: record.session_id,
            domain_name: record.domain_name,
        }
    }
}

/// Creates a Migrator for knowledge records.
pub fn create_knowledge_migrator() -> Result<Migrator, MigrationError> {
    let mut migrator = Migrator::builder().build();

    let knowledge_path = Migrator::define("knowledge")
        .from::<KnowledgeRecordV1_0_0>()
        .into_with_save::<KnowledgeRecord>();
    migrator.register(knowledge_path)?;

    Ok(migrator)
}
