//! TOML-based ConfigRepository implementation.

use crate::paths::GleanerPaths;
use gleaner_core::config::AppConfig;
use gleaner_core::domain::{ConfigRepository, DomainConfig, META_CATEGORY, UNCATEGORIZED};
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::persona::PersonaConfig;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Application configuration loaded once from a TOML file.
///
/// Responsibilities:
/// - Parse `config.toml` into [`AppConfig`]
/// - Serve domain and persona lookups by name
/// - Report structural problems for `check-config`
///
/// Does NOT:
/// - Write configuration back (the file is user-owned)
/// - Render greeting templates (the prompt library owns the template engine)
#[derive(Debug, Clone)]
pub struct TomlConfigRepository {
    config: AppConfig,
    source: Option<PathBuf>,
}

impl TomlConfigRepository {
    /// Loads from the default path (`~/.config/gleaner/config.toml`).
    pub fn default_location() -> Result<Self> {
        let path = GleanerPaths::config_file()?;
        Self::load(path)
    }

    /// Loads from `path`. A missing file is a configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GleanerError::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let mut repository = Self::from_toml_str(&content)?;
        repository.source = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            domains = repository.config.domains.len(),
            personas = repository.config.personas.len(),
            "Loaded configuration"
        );
        Ok(repository)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: AppConfig) -> Self {
        Self {
            config,
            source: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// File the configuration was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Lists structural problems. An empty list means the file is usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut domain_names = HashSet::new();
        for domain in &self.config.domains {
            if !domain_names.insert(domain.name.as_str()) {
                problems.push(format!("domain '{}' is defined more than once", domain.name));
            }
            problems.extend(domain_problems(domain));
        }

        let mut persona_names = HashSet::new();
        for persona in &self.config.personas {
            if persona.name.trim().is_empty() {
                problems.push("a persona has an empty name".to_string());
            } else if !persona_names.insert(persona.name.as_str()) {
                problems.push(format!("persona '{}' is defined more than once", persona.name));
            }
        }

        debug!(count = problems.len(), "Checked configuration");
        problems
    }
}

fn domain_problems(domain: &DomainConfig) -> Vec<String> {
    let mut problems = Vec::new();
    if domain.name.trim().is_empty() {
        problems.push("a domain has an empty name".to_string());
    }
    if let Err(e) = domain.ensure_usable() {
        problems.push(e.to_string());
    }

    let mut ids = HashSet::new();
    for category in &domain.categories {
        if category.id.trim().is_empty() {
            problems.push(format!("domain '{}' has a category without id", domain.name));
            continue;
        }
        if category.id == UNCATEGORIZED || category.id == META_CATEGORY {
            problems.push(format!(
                "domain '{}' uses reserved category id '{}'",
                domain.name, category.id
            ));
        }
        if !ids.insert(category.id.as_str()) {
            problems.push(format!(
                "domain '{}' defines category '{}' more than once",
                domain.name, category.id
            ));
        }
        let mut fields = HashSet::new();
        for field in category.all_fields() {
            if !fields.insert(field.as_str()) {
                problems.push(format!(
                    "category '{}.{}' lists field '{}' more than once",
                    domain.name, category.id, field
                ));
            }
        }
    }
    problems
}

impl ConfigRepository for TomlConfigRepository {
    fn domain(&self, name: &str) -> Option<DomainConfig> {
        self.config.domains.iter().find(|d| d.name == name).cloned()
    }

    fn persona(&self, name: &str) -> Option<PersonaConfig> {
        self.config.personas.iter().find(|p| p.name == name).cloned()
    }
}
