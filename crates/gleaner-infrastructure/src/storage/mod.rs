//! Shared setup for the AsyncDirStorage-backed repositories.
//!
//! Each repository keeps one JSON document per entity under
//! `<base_dir>/<domain>/`, written and migrated by version-migrate.

use gleaner_core::error::{GleanerError, Result};
use std::path::Path;
use tokio::fs;
use version_migrate::{
    AppPaths, AsyncDirStorage, DirStorageStrategy, FilenameEncoding, FormatStrategy,
    MigrationError, Migrator, PathStrategy,
};

const APP_NAME: &str = "gleaner";

/// Opens an [`AsyncDirStorage`] rooted at `base_dir/domain`.
pub async fn open_dir_storage(
    base_dir: &Path,
    domain: &str,
    migrator: Migrator,
) -> Result<AsyncDirStorage> {
    fs::create_dir_all(base_dir).await.map_err(|e| {
        GleanerError::data_access(format!(
            "Failed to create base directory {}: {}",
            base_dir.display(),
            e
        ))
    })?;

    let paths =
        AppPaths::new(APP_NAME).data_strategy(PathStrategy::CustomBase(base_dir.to_path_buf()));
    let strategy = DirStorageStrategy::default()
        .with_format(FormatStrategy::Json)
        .with_filename_encoding(FilenameEncoding::Direct);

    AsyncDirStorage::new(paths, domain, migrator, strategy)
        .await
        .map_err(|e| GleanerError::data_access(format!("Failed to open {domain} storage: {e}")))
}

/// Rejects ids that cannot be used verbatim as file names.
pub fn check_id(entity: &str, id: &str) -> Result<()> {
    let usable = !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(['/', '\\'])
        && !id.contains("..");
    if usable {
        Ok(())
    } else {
        Err(GleanerError::data_access(format!("invalid {entity} id '{id}'")))
    }
}

/// Whether a storage error only says the entity does not exist.
pub fn is_not_found(err: &MigrationError) -> bool {
    if matches!(err, MigrationError::EntityNotFound(_)) {
        return true;
    }
    let message = err.to_string();
    message.contains("No such file or directory")
        || message.contains("not found")
        || message.contains("cannot find")
}

/// Maps a storage error onto the gleaner taxonomy.
pub fn storage_error(action: &str, err: MigrationError) -> GleanerError {
    match err {
        MigrationError::EntityNotFound(id) => GleanerError::not_found("entity", id),
        MigrationError::DeserializationError(_) | MigrationError::SerializationError(_) => {
            GleanerError::Serialization {
                format: "migration".to_string(),
                message: format!("Failed to {action}: {err}"),
            }
        }
        _ => GleanerError::data_access(format!("Failed to {action}: {err}")),
    }
}
