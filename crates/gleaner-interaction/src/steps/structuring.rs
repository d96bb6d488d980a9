use super::{PipelineStep, StepContext};
use crate::contract::OutputContract;
use crate::gateway::ModelGateway;
use crate::prompts::PromptLibrary;
use async_trait::async_trait;
use gleaner_core::domain::{CategoryDefinition, UNCATEGORIZED};
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::knowledge::{
    EntryDraft, FollowUp, KnowledgeEntry, SUGGESTED_CATEGORY_LABEL_KEY, TOPIC_KEYWORDS_KEY,
};
use gleaner_core::pipeline::{PipelineState, StepKind, StepOutput, StructuringOutput};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;

const TITLE_CHARS: usize = 60;

/// Extracts a structured knowledge entry from the turn.
///
/// On a follow-up turn about the same topic the previous entry is merged
/// into rather than replaced, keeping its id and creation time.
pub struct StructuringExtractor {
    gateway: Arc<ModelGateway>,
    prompts: Arc<PromptLibrary>,
    contract: OutputContract,
}

#[derive(Debug, Deserialize)]
struct RawStructuring {
    title: String,
    content: String,
    #[serde(default)]
    structured_data: Map<String, Value>,
    #[serde(default)]
    tags: Vec<String>,
}

impl StructuringExtractor {
    pub fn new(gateway: Arc<ModelGateway>, prompts: Arc<PromptLibrary>) -> Result<Self> {
        Ok(Self {
            gateway,
            prompts,
            contract: OutputContract::new(output_schema())?,
        })
    }
}

fn output_schema() -> Value {
    json!({
        "type": "object",
        "required": ["title", "content", "structured_data", "is_complete"],
        "properties": {
            "title": {"type": "string"},
            "content": {"type": "string"},
            "structured_data": {"type": "object"},
            "tags": {"type": "array", "items": {"type": "string"}},
            "is_complete": {"type": "boolean"},
            "missing_fields": {"type": "array", "items": {"type": "string"}}
        }
    })
}

/// The entry this turn continues, if any.
///
/// A topic change always starts a new entry. An uncategorized entry may be
/// continued under the category it was refined into.
fn merge_target<'a>(state: &'a PipelineState, category_id: &str) -> Option<&'a KnowledgeEntry> {
    let topic_change = state
        .classifier_output
        .as_ref()
        .is_some_and(|c| c.is_topic_change);
    if topic_change {
        return None;
    }
    state
        .turn_context
        .previous_entry
        .as_ref()
        .filter(|e| e.category_id == category_id || e.category_id == UNCATEGORIZED)
}

#[async_trait]
impl PipelineStep for StructuringExtractor {
    fn kind(&self) -> StepKind {
        StepKind::Structuring
    }

    async fn run(&self, state: &PipelineState, ctx: &StepContext<'_>) -> Result<StepOutput> {
        let agent = self.kind().to_string();
        let classification = state
            .classifier_output
            .as_ref()
            .filter(|c| !c.category_id.trim().is_empty())
            .ok_or_else(|| GleanerError::precondition(&agent, "turn has no classified category"))?;

        let category_id = classification.category_id.as_str();
        let category = if category_id == UNCATEGORIZED {
            None
        } else {
            Some(ctx.domain.category(category_id).ok_or_else(|| {
                GleanerError::UnknownCategory {
                    agent: agent.clone(),
                    category_id: category_id.to_string(),
                }
            })?)
        };
        let previous = merge_target(state, category_id);
        let gaps = state
            .gap_reasoning_output
            .as_ref()
            .map(|g| g.gaps.clone())
            .unwrap_or_default();

        let prompt = self.prompts.render_step(
            StepKind::Structuring,
            json!({
                "uncategorized": category.is_none(),
                "category": category,
                "previous_entry": previous,
                "gaps": gaps,
                "summary": classification.summary,
                "input": state.input.content,
            }),
        )?;

        let raw: RawStructuring = self
            .gateway
            .invoke_and_validate(&agent, &prompt, &self.contract)
            .await?;
        let output = materialize(raw, state, category, previous);

        debug!(
            session_id = %state.session_id,
            entry_id = %output.entry.id,
            merged = previous.is_some(),
            missing = output.missing_fields.len(),
            "structured entry"
        );
        Ok(StepOutput::Structuring(output))
    }
}

fn materialize(
    raw: RawStructuring,
    state: &PipelineState,
    category: Option<&CategoryDefinition>,
    previous: Option<&KnowledgeEntry>,
) -> StructuringOutput {
    let classification = state.classifier_output.as_ref();
    let category_id = category.map_or(UNCATEGORIZED, |c| c.id.as_str());

    let mut structured_data = raw.structured_data;
    if category.is_none() {
        let label = classification.and_then(|c| c.suggested_category_label.clone());
        if let Some(label) = label.filter(|l| !l.trim().is_empty()) {
            structured_data
                .entry(SUGGESTED_CATEGORY_LABEL_KEY)
                .or_insert(Value::String(label));
        }
    }

    let mut title = raw.title.trim().to_string();
    if title.is_empty() && previous.is_none() {
        title = state.input.content.trim().chars().take(TITLE_CHARS).collect();
    }

    let draft = EntryDraft {
        category_id: category_id.to_string(),
        title,
        content: raw.content,
        structured_data,
        tags: raw.tags,
        follow_up: state.gap_reasoning_output.as_ref().map(|g| FollowUp {
            gaps: g.gaps.clone(),
            suggested_questions: g.question_texts(),
        }),
    };

    let entry = match previous {
        Some(previous) => previous.merged_with(draft),
        None => KnowledgeEntry::from_draft(draft),
    };

    let missing_fields: Vec<String> = match category {
        Some(category) => category
            .required_fields
            .iter()
            .filter(|f| !entry.has_field(f))
            .cloned()
            .collect(),
        None => [SUGGESTED_CATEGORY_LABEL_KEY, TOPIC_KEYWORDS_KEY]
            .into_iter()
            .filter(|f| !entry.has_field(f))
            .map(str::to_string)
            .collect(),
    };

    StructuringOutput {
        is_complete: missing_fields.is_empty(),
        entry,
        missing_fields,
    }
}
