use super::{PipelineStep, StepContext};
use async_trait::async_trait;
use gleaner_core::error::Result;
use gleaner_core::pipeline::{ContextMatch, ContextOutput, PipelineState, StepKind, StepOutput};
use gleaner_core::search::{EmbeddingSearchClient, SimilarityQuery};
use std::sync::Arc;
use tracing::{debug, warn};

const NOT_CONFIGURED: &str = "Context retrieval not configured.";
const NO_MATCHES: &str = "No related knowledge found.";

/// Finds related knowledge already collected in the same domain.
///
/// Never fails a turn: missing search, embedding errors and search errors
/// all produce an empty context.
pub struct ContextRetriever {
    search: Option<Arc<dyn EmbeddingSearchClient>>,
}

impl ContextRetriever {
    pub fn new(search: Option<Arc<dyn EmbeddingSearchClient>>) -> Self {
        Self { search }
    }

    async fn retrieve(
        &self,
        search: &dyn EmbeddingSearchClient,
        state: &PipelineState,
        ctx: &StepContext<'_>,
    ) -> Result<ContextOutput> {
        let vector = search.embed(&state.input.content).await?;
        let hits = search
            .search_similar(SimilarityQuery {
                domain_id: ctx.domain.name.clone(),
                vector,
                limit: ctx.settings.search_limit,
                exclude_session_id: None,
            })
            .await?;

        let matches: Vec<ContextMatch> = hits
            .into_iter()
            .map(|hit| ContextMatch {
                entry_id: hit.entry.id,
                title: hit.entry.title,
                category_id: hit.entry.category_id,
                score: hit.score,
                same_session: hit.session_id == state.session_id,
            })
            .collect();

        Ok(ContextOutput {
            summary: summarize(&matches),
            matches,
        })
    }
}

fn summarize(matches: &[ContextMatch]) -> String {
    if matches.is_empty() {
        return NO_MATCHES.to_string();
    }
    let lines: Vec<String> = matches
        .iter()
        .map(|m| {
            let origin = if m.same_session { "this session" } else { "other session" };
            format!("- {} (similarity {:.2}, {})", m.title, m.score, origin)
        })
        .collect();
    format!("Related knowledge:\n{}", lines.join("\n"))
}

#[async_trait]
impl PipelineStep for ContextRetriever {
    fn kind(&self) -> StepKind {
        StepKind::ContextRetriever
    }

    async fn run(&self, state: &PipelineState, ctx: &StepContext<'_>) -> Result<StepOutput> {
        let Some(search) = self.search.as_deref() else {
            return Ok(StepOutput::Context(ContextOutput::empty(NOT_CONFIGURED)));
        };

        let output = match self.retrieve(search, state, ctx).await {
            Ok(output) => {
                debug!(session_id = %state.session_id, matches = output.matches.len(), "retrieved context");
                output
            }
            Err(e) => {
                warn!(session_id = %state.session_id, "context retrieval failed, continuing without context: {e}");
                ContextOutput::empty(format!("Context retrieval unavailable: {e}"))
            }
        };
        Ok(StepOutput::Context(output))
    }
}
