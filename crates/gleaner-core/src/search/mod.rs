//! Embedding and similarity search abstraction.

use crate::error::Result;
use crate::knowledge::KnowledgeEntry;
use async_trait::async_trait;

/// A nearest-neighbor query scoped to one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityQuery {
    pub domain_id: String,
    pub vector: Vec<f32>,
    pub limit: usize,
    /// Leave out entries collected in this session
    pub exclude_session_id: Option<String>,
}

/// A search hit with the session it was collected in.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarEntry {
    pub entry: KnowledgeEntry,
    pub session_id: String,
    pub score: f32,
}

/// Computes embeddings and finds similar knowledge entries.
///
/// Results are ranked by descending similarity. Implementations filter out
/// hits below their minimum similarity.
#[async_trait]
pub trait EmbeddingSearchClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn search_similar(&self, query: SimilarityQuery) -> Result<Vec<SimilarEntry>>;
}
