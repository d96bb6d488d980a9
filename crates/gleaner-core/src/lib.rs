pub mod config;
pub mod domain;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod persona;
pub mod pipeline;
pub mod search;
pub mod session;

// Re-export common error type
pub use error::{GleanerError, Result};
