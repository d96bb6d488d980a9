//! AsyncDirStorage-based KnowledgeRepository implementation

use crate::dto::create_knowledge_migrator;
use crate::paths::GleanerPaths;
use crate::storage::{check_id, is_not_found, open_dir_storage, storage_error};
use async_trait::async_trait;
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::knowledge::{KnowledgeRecord, KnowledgeRepository};
use std::path::Path;
use version_migrate::AsyncDirStorage;

const ENTITY_NAME: &str = "knowledge";

/// Stores each knowledge record as a document named after its entry id.
///
/// Listing reads the whole directory; collections are expected to stay small
/// enough for a single user's interviews.
pub struct AsyncDirKnowledgeRepository {
    storage: AsyncDirStorage,
}

impl AsyncDirKnowledgeRepository {
    pub async fn default_location() -> Result<Self> {
        let base_dir = GleanerPaths::data_dir()?;
        Self::new(base_dir).await
    }

    /// Opens the repository under `base_dir`, creating `knowledge/` when needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let migrator = create_knowledge_migrator()
            .map_err(|e| GleanerError::internal(format!("knowledge migrator: {e}")))?;
        let storage = open_dir_storage(base_dir.as_ref(), "knowledge", migrator).await?;
        Ok(Self { storage })
    }

    async fn list_where(
        &self,
        keep: impl Fn(&KnowledgeRecord) -> bool,
    ) -> Result<Vec<KnowledgeRecord>> {
        let all_records = self
            .storage
            .load_all::<KnowledgeRecord>(ENTITY_NAME)
            .await
            .map_err(|e| storage_error("load knowledge records", e))?;

        let mut records: Vec<KnowledgeRecord> = all_records
            .into_iter()
            .map(|(_, record)| record)
            .filter(|record| keep(record))
            .collect();
        records.sort_by(|a, b| a.entry.created_at.cmp(&b.entry.created_at));
        Ok(records)
    }
}

#[async_trait]
impl KnowledgeRepository for AsyncDirKnowledgeRepository {
    async fn save(&self, record: &KnowledgeRecord) -> Result<()> {
        check_id(ENTITY_NAME, &record.entry.id)?;
        self.storage
            .save(ENTITY_NAME, &record.entry.id, record)
            .await
            .map_err(|e| storage_error("save knowledge record", e))
    }

    async fn find_by_id(&self, entry_id: &str) -> Result<Option<KnowledgeRecord>> {
        check_id(ENTITY_NAME, entry_id)?;
        match self.storage.load::<KnowledgeRecord>(ENTITY_NAME, entry_id).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(storage_error("load knowledge record", e)),
        }
    }

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<KnowledgeRecord>> {
        self.list_where(|record| record.session_id == session_id).await
    }

    async fn list_by_domain(&self, domain_name: &str) -> Result<Vec<KnowledgeRecord>> {
        self.list_where(|record| record.domain_name == domain_name).await
    }
}
