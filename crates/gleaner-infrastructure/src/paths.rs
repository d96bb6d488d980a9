//! Unified path management for gleaner files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/gleaner/           # Config directory
//! └── config.toml              # Domains, personas and runtime settings
//!
//! ~/.local/share/gleaner/      # Data directory
//! ├── sessions/                # One JSON file per session (AsyncDirStorage)
//! └── knowledge/               # One JSON file per knowledge entry (AsyncDirStorage)
//! ```

use gleaner_core::error::GleanerError;
use std::path::PathBuf;
use version_migrate::AppPaths;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
    /// Platform data directory could not be determined.
    DataDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
            PathError::DataDirNotFound => write!(f, "Cannot find data directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for GleanerError {
    fn from(err: PathError) -> Self {
        GleanerError::config(err.to_string())
    }
}

/// Well-known locations of gleaner files, resolved through version-migrate's
/// `AppPaths` so they match what `AsyncDirStorage` uses.
pub struct GleanerPaths;

impl GleanerPaths {
    fn app_paths() -> AppPaths {
        AppPaths::new("gleaner")
    }

    /// Returns the gleaner configuration directory (e.g. `~/.config/gleaner/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        Self::app_paths()
            .config_dir()
            .map_err(|_| PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the gleaner data directory (e.g. `~/.local/share/gleaner/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        Self::app_paths()
            .data_dir()
            .map_err(|_| PathError::DataDirNotFound)
    }
}
