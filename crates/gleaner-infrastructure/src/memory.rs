//! In-memory repositories.
//!
//! Used by tests and by short-lived processes that do not need durability.

use async_trait::async_trait;
use gleaner_core::error::Result;
use gleaner_core::knowledge::{KnowledgeRecord, KnowledgeRepository};
use gleaner_core::session::{Session, SessionRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

/// Knowledge records keyed by entry id.
#[derive(Default)]
pub struct InMemoryKnowledgeRepository {
    records: RwLock<HashMap<String, KnowledgeRecord>>,
}

impl InMemoryKnowledgeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn list_where(&self, keep: impl Fn(&KnowledgeRecord) -> bool) -> Vec<KnowledgeRecord> {
        let mut records: Vec<KnowledgeRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|record| keep(*record))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.entry.created_at.cmp(&b.entry.created_at));
        records
    }
}

#[async_trait]
impl KnowledgeRepository for InMemoryKnowledgeRepository {
    async fn save(&self, record: &KnowledgeRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.entry.id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_id(&self, entry_id: &str) -> Result<Option<KnowledgeRecord>> {
        Ok(self.records.read().await.get(entry_id).cloned())
    }

    async fn list_by_session(&self, session_id: &str) -> Result<Vec<KnowledgeRecord>> {
        Ok(self.list_where(|record| record.session_id == session_id).await)
    }

    async fn list_by_domain(&self, domain_name: &str) -> Result<Vec<KnowledgeRecord>> {
        Ok(self.list_where(|record| record.domain_name == domain_name).await)
    }
}
