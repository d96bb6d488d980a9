//! Completeness scoring.
//!
//! A pure function of an entry and its domain configuration. Calling it
//! repeatedly with the same inputs always yields the same score.

use super::model::{KnowledgeEntry, SUGGESTED_CATEGORY_LABEL_KEY, TOPIC_KEYWORDS_KEY};
use crate::domain::{DomainConfig, UNCATEGORIZED};
use serde_json::Value;

/// Maximum score reachable from optional fields alone.
pub const OPTIONAL_ONLY_CAP: f64 = 0.8;

/// Maximum score of an uncategorized entry. Stays below the usual
/// completion threshold so such entries are never auto-completed.
pub const UNCATEGORIZED_CAP: f64 = 0.85;

/// Score for a field-less category entry with some content.
pub const CONTENT_ONLY_SCORE: f64 = 0.3;

/// Score for a field-less category entry whose content passes [`RICH_CONTENT_CHARS`].
pub const RICH_CONTENT_SCORE: f64 = 0.5;

/// Content length (in characters) that counts as rich content.
pub const RICH_CONTENT_CHARS: usize = 200;

/// Scores `entry` against its category in `domain`, in `[0, 1]`.
pub fn score(entry: &KnowledgeEntry, domain: &DomainConfig) -> f64 {
    if entry.category_id == UNCATEGORIZED {
        return score_uncategorized(entry);
    }

    let Some(category) = domain.category(&entry.category_id) else {
        return 0.0;
    };

    if !category.required_fields.is_empty() {
        return filled_fraction(entry, &category.required_fields);
    }

    if !category.optional_fields.is_empty() {
        return filled_fraction(entry, &category.optional_fields) * OPTIONAL_ONLY_CAP;
    }

    let content_chars = entry.content.trim().chars().count();
    if content_chars == 0 {
        0.0
    } else if content_chars >= RICH_CONTENT_CHARS {
        RICH_CONTENT_SCORE
    } else {
        CONTENT_ONLY_SCORE
    }
}

fn filled_fraction(entry: &KnowledgeEntry, fields: &[String]) -> f64 {
    let filled = fields.iter().filter(|f| entry.has_field(f)).count();
    filled as f64 / fields.len() as f64
}

fn score_uncategorized(entry: &KnowledgeEntry) -> f64 {
    let has_keywords = match entry.structured_data.get(TOPIC_KEYWORDS_KEY) {
        Some(Value::Array(items)) => items.iter().any(super::is_present_value),
        Some(Value::String(s)) => !s.trim().is_empty(),
        _ => false,
    };
    let signals = [
        !entry.content.trim().is_empty(),
        entry.has_field(SUGGESTED_CATEGORY_LABEL_KEY),
        has_keywords,
    ];
    let filled = signals.iter().filter(|s| **s).count() as f64;
    (filled / signals.len() as f64).min(UNCATEGORIZED_CAP)
}
