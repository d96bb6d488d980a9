//! Knowledge entry module.
//!
//! # Module Structure
//!
//! - `model`: `KnowledgeEntry`, its follow-up hints and merge behavior
//! - `completeness`: pure completeness scoring against a domain
//! - `repository`: persistence trait for entries

pub mod completeness;
mod model;
mod repository;

pub use completeness::score as completeness_score;
pub use model::{
    EntryDraft, FollowUp, KnowledgeEntry, KnowledgeRecord, SUGGESTED_CATEGORY_LABEL_KEY,
    TOPIC_KEYWORDS_KEY, is_present_value,
};
pub use repository::KnowledgeRepository;
