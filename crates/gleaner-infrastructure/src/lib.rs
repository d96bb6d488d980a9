pub mod async_dir_knowledge_repository;
pub mod async_dir_session_repository;
pub mod dto;
pub mod local_embedding_search;
pub mod memory;
pub mod paths;
pub mod storage;
pub mod toml_config_repository;

pub use crate::async_dir_knowledge_repository::AsyncDirKnowledgeRepository;
pub use crate::async_dir_session_repository::AsyncDirSessionRepository;
pub use crate::local_embedding_search::{HashingEmbedder, LocalEmbeddingSearch};
pub use crate::memory::{InMemoryKnowledgeRepository, InMemorySessionRepository};
pub use crate::paths::GleanerPaths;
pub use crate::toml_config_repository::TomlConfigRepository;
