//! AsyncDirStorage-based SessionRepository implementation

use crate::dto::create_session_migrator;
use crate::paths::GleanerPaths;
use crate::storage::{check_id, is_not_found, open_dir_storage, storage_error};
use async_trait::async_trait;
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::session::{Session, SessionRepository};
use std::path::Path;
use version_migrate::AsyncDirStorage;

const ENTITY_NAME: &str = "session";

/// AsyncDirStorage-based session repository.
///
/// Directory structure:
/// ```text
/// base_dir/
/// └── sessions/
///     ├── <session-id-1>.json
///     └── <session-id-2>.json
/// ```
pub struct AsyncDirSessionRepository {
    storage: AsyncDirStorage,
}

impl AsyncDirSessionRepository {
    /// Opens the repository under the default data directory
    /// (`~/.local/share/gleaner`).
    pub async fn default_location() -> Result<Self> {
        let base_dir = GleanerPaths::data_dir()?;
        Self::new(base_dir).await
    }

    /// Opens the repository under `base_dir`, creating `sessions/` when needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let migrator = create_session_migrator()
            .map_err(|e| GleanerError::internal(format!("session migrator: {e}")))?;
        let storage = open_dir_storage(base_dir.as_ref(), "sessions", migrator).await?;
        Ok(Self { storage })
    }

    /// Returns the directory session files are written to.
    pub fn sessions_dir(&self) -> &Path {
        self.storage.base_path()
    }
}

#[async_trait]
impl SessionRepository for AsyncDirSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        check_id(ENTITY_NAME, session_id)?;
        match self.storage.load::<Session>(ENTITY_NAME, session_id).await {
            Ok(session) => Ok(Some(session)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(storage_error("load session", e)),
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        check_id(ENTITY_NAME, &session.id)?;
        self.storage
            .save(ENTITY_NAME, &session.id, session)
            .await
            .map_err(|e| storage_error("save session", e))
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        check_id(ENTITY_NAME, session_id)?;
        match self.storage.delete(session_id).await {
            Err(e) if !is_not_found(&e) => Err(storage_error("delete session", e)),
            _ => Ok(()),
        }
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let all_sessions = self
            .storage
            .load_all::<Session>(ENTITY_NAME)
            .await
            .map_err(|e| storage_error("load all sessions", e))?;

        let mut sessions: Vec<Session> = all_sessions.into_iter().map(|(_, s)| s).collect();
        // Most recent first
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}
