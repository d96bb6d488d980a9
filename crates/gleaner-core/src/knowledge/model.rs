//! Knowledge entry domain model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured-data key holding the label proposed for an uncategorized entry.
pub const SUGGESTED_CATEGORY_LABEL_KEY: &str = "suggested_category_label";

/// Structured-data key holding topic keywords of an uncategorized entry.
pub const TOPIC_KEYWORDS_KEY: &str = "topic_keywords";

/// Gaps and suggested questions attached to an entry for later turns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FollowUp {
    pub gaps: Vec<String>,
    pub suggested_questions: Vec<String>,
}

/// A structured piece of knowledge collected during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Unique entry identifier (UUID format)
    pub id: String,
    /// Category the entry belongs to (configured id or the uncategorized sentinel)
    pub category_id: String,
    /// Short title
    pub title: String,
    /// Free-text narrative accumulated across turns
    pub content: String,
    /// Extracted field values keyed by category field name
    #[serde(default)]
    pub structured_data: Map<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUp>,
    /// Timestamp when the entry was created (ISO 8601 format)
    pub created_at: String,
    /// Timestamp when the entry was last updated (ISO 8601 format)
    pub updated_at: String,
}

/// Newly extracted data for an entry, before it is merged or materialized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryDraft {
    pub category_id: String,
    pub title: String,
    pub content: String,
    pub structured_data: Map<String, Value>,
    pub tags: Vec<String>,
    pub follow_up: Option<FollowUp>,
}

/// An entry together with where it was collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub entry: KnowledgeEntry,
    pub session_id: String,
    pub domain_name: String,
}

/// A value counts as present when it is neither null nor a blank string.
pub fn is_present_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

impl KnowledgeEntry {
    /// Materializes a draft as a brand-new entry.
    pub fn from_draft(draft: EntryDraft) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let structured_data = draft
            .structured_data
            .into_iter()
            .filter(|(_, v)| is_present_value(v))
            .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category_id: draft.category_id,
            title: draft.title,
            content: draft.content,
            structured_data,
            tags: dedup_tags(draft.tags),
            follow_up: draft.follow_up,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Merges newly extracted data into this entry.
    ///
    /// `id` and `created_at` are preserved, and the category only changes when
    /// the draft names one (an uncategorized entry being refined). Present values in the
    /// draft override earlier ones; missing or blank values never erase what is
    /// already known. Content is appended unless the draft already restates it.
    pub fn merged_with(&self, draft: EntryDraft) -> Self {
        let mut structured_data = self.structured_data.clone();
        for (key, value) in draft.structured_data {
            if is_present_value(&value) {
                structured_data.insert(key, value);
            }
        }

        let title = if draft.title.trim().is_empty() {
            self.title.clone()
        } else {
            draft.title
        };

        let mut tags = self.tags.clone();
        tags.extend(draft.tags);

        let category_id = if draft.category_id.is_empty() {
            self.category_id.clone()
        } else {
            draft.category_id
        };

        Self {
            id: self.id.clone(),
            category_id,
            title,
            content: merge_content(&self.content, &draft.content),
            structured_data,
            tags: dedup_tags(tags),
            follow_up: draft.follow_up.or_else(|| self.follow_up.clone()),
            created_at: self.created_at.clone(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether `field` holds a present value in `structured_data`.
    pub fn has_field(&self, field: &str) -> bool {
        self.structured_data
            .get(field)
            .is_some_and(is_present_value)
    }

    /// Names of all fields holding present values.
    pub fn filled_fields(&self) -> Vec<String> {
        self.structured_data
            .iter()
            .filter(|(_, v)| is_present_value(v))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

fn merge_content(previous: &str, addition: &str) -> String {
    let previous_trimmed = previous.trim();
    let addition_trimmed = addition.trim();

    if addition_trimmed.is_empty() || previous_trimmed.contains(addition_trimmed) {
        return previous.to_string();
    }
    if previous_trimmed.is_empty() || addition_trimmed.contains(previous_trimmed) {
        return addition.to_string();
    }
    format!("{}\n\n{}", previous_trimmed, addition_trimmed)
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}
