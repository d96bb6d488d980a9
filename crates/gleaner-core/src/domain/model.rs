//! Domain configuration model.

use crate::error::{GleanerError, Result};
use serde::{Deserialize, Serialize};

/// Sentinel category id for input that fits no configured category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Sentinel category id for conversational turns (greetings, proactive requests).
pub const META_CATEGORY: &str = "meta";

/// A single knowledge category with the fields that describe a complete entry.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CategoryDefinition {
    /// Stable identifier referenced by classifier output and entries
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// What kind of knowledge belongs here
    #[serde(default)]
    pub description: String,
    /// Fields that must be present for the entry to be complete
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Fields that enrich an entry but are not required
    #[serde(default)]
    pub optional_fields: Vec<String>,
}

impl CategoryDefinition {
    /// Required fields first, then optional ones.
    pub fn all_fields(&self) -> impl Iterator<Item = &String> {
        self.required_fields.iter().chain(self.optional_fields.iter())
    }

    /// Whether `field` is declared by this category.
    pub fn declares(&self, field: &str) -> bool {
        self.all_fields().any(|f| f == field)
    }
}

/// A knowledge domain: the set of categories a session collects against.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DomainConfig {
    /// Unique domain name (also used to scope similarity search)
    pub name: String,
    /// Short description used in prompts and greetings
    #[serde(default)]
    pub description: String,
    /// Configured categories (`[[domain.category]]` tables in TOML)
    #[serde(default, rename(deserialize = "category"), alias = "categories")]
    pub categories: Vec<CategoryDefinition>,
}

impl DomainConfig {
    /// Looks up a configured category by id.
    pub fn category(&self, id: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// True for configured ids and for both sentinels.
    pub fn is_known_category(&self, id: &str) -> bool {
        id == UNCATEGORIZED || id == META_CATEGORY || self.category(id).is_some()
    }

    /// Ids of configured categories in declaration order.
    pub fn category_ids(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.id.as_str()).collect()
    }

    /// Fails with a configuration error when no categories are defined.
    pub fn ensure_usable(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(GleanerError::config(format!(
                "domain '{}' defines no categories",
                self.name
            )));
        }
        Ok(())
    }
}
