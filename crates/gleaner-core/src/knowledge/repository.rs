//! Knowledge repository trait.

use super::model::KnowledgeRecord;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for knowledge entries.
///
/// Entries are keyed by their id; saving an entry with an existing id replaces
/// the stored record (follow-up turns update the same entry).
#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    /// Inserts or replaces a record.
    async fn save(&self, record: &KnowledgeRecord) -> Result<()>;

    /// Finds a record by entry id.
    async fn find_by_id(&self, entry_id: &str) -> Result<Option<KnowledgeRecord>>;

    /// Lists records collected in one session.
    async fn list_by_session(&self, session_id: &str) -> Result<Vec<KnowledgeRecord>>;

    /// Lists records collected for one domain.
    async fn list_by_domain(&self, domain_name: &str) -> Result<Vec<KnowledgeRecord>>;
}
