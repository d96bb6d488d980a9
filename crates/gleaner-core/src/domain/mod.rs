//! Domain configuration module.
//!
//! Read-only category definitions that drive classification, gap reasoning,
//! structuring and completeness scoring.

mod model;
mod repository;

pub use model::{CategoryDefinition, DomainConfig, META_CATEGORY, UNCATEGORIZED};
pub use repository::ConfigRepository;
