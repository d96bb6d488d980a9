//! In-process similarity search over collected knowledge.
//!
//! Embeddings come from feature hashing: each word and adjacent word pair is
//! hashed into a fixed number of signed buckets and the vector is L2
//! normalized. Scores are cosine similarities.

use async_trait::async_trait;
use gleaner_core::error::Result;
use gleaner_core::knowledge::{KnowledgeEntry, KnowledgeRepository};
use gleaner_core::search::{EmbeddingSearchClient, SimilarEntry, SimilarityQuery};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_DIMENSIONS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Deterministic hashing embedder.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = tokenize(text);

        let bigrams = tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1]));
        for feature in tokens.iter().cloned().chain(bigrams) {
            let hash = fnv1a(&feature);
            let index = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Cosine similarity; zero when either vector is empty, zero or mismatched.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// The text an entry is indexed under.
fn searchable_text(entry: &KnowledgeEntry) -> String {
    let mut parts = vec![entry.title.clone(), entry.content.clone()];
    for value in entry.structured_data.values() {
        match value {
            Value::String(s) => parts.push(s.clone()),
            Value::Null => {}
            other => parts.push(other.to_string()),
        }
    }
    parts.extend(entry.tags.iter().cloned());
    parts.join(" ")
}

/// Similarity search backed by any knowledge repository.
pub struct LocalEmbeddingSearch {
    knowledge: Arc<dyn KnowledgeRepository>,
    embedder: HashingEmbedder,
    min_similarity: f32,
}

impl LocalEmbeddingSearch {
    pub fn new(knowledge: Arc<dyn KnowledgeRepository>) -> Self {
        Self {
            knowledge,
            embedder: HashingEmbedder::default(),
            min_similarity: 0.3,
        }
    }

    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

#[async_trait]
impl EmbeddingSearchClient for LocalEmbeddingSearch {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embedder.embed(text))
    }

    async fn search_similar(&self, query: SimilarityQuery) -> Result<Vec<SimilarEntry>> {
        let records = self.knowledge.list_by_domain(&query.domain_id).await?;
        let candidates = records.len();

        let mut hits: Vec<SimilarEntry> = records
            .into_iter()
            .filter(|record| {
                query
                    .exclude_session_id
                    .as_deref()
                    .is_none_or(|excluded| record.session_id != excluded)
            })
            .filter_map(|record| {
                let vector = self.embedder.embed(&searchable_text(&record.entry));
                let score = cosine_similarity(&query.vector, &vector);
                (score >= self.min_similarity).then_some(SimilarEntry {
                    entry: record.entry,
                    session_id: record.session_id,
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.limit);

        debug!(
            domain = %query.domain_id,
            candidates,
            hits = hits.len(),
            "Local similarity search finished"
        );
        Ok(hits)
    }
}
