use super::{PipelineStep, StepContext, recent_turns};
use crate::contract::OutputContract;
use crate::gateway::ModelGateway;
use crate::prompts::PromptLibrary;
use async_trait::async_trait;
use gleaner_core::domain::CategoryDefinition;
use gleaner_core::error::Result;
use gleaner_core::pipeline::{
    FollowUpQuestion, GapAnalysis, GapMode, Intent, PipelineState, QuestionPurpose, StepKind,
    StepOutput,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const RECURRENCE_QUESTIONS: &[&str] = &[
    "Does this happen regularly, or was it a one-time thing?",
    "Have you seen or heard of this happening more than once?",
];

/// Works out what is still missing and which questions to ask next.
pub struct GapReasoner {
    gateway: Arc<ModelGateway>,
    prompts: Arc<PromptLibrary>,
    contract: OutputContract,
}

#[derive(Debug, Deserialize)]
struct RawGapAnalysis {
    #[serde(default)]
    gaps: Vec<String>,
    #[serde(default)]
    questions: Vec<FollowUpQuestion>,
    #[serde(default)]
    reasoning: String,
}

impl GapReasoner {
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
        "required": ["gaps", "questions", "reasoning"],
        "properties": {
            "gaps": {"type": "array", "items": {"type": "string"}},
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["question"],
                    "properties": {
                        "question": {"type": "string", "minLength": 1},
                        "target_field": {"type": ["string", "null"]},
                        "answerability": {"enum": ["high", "medium", "low"]},
                        "purpose": {"enum": ["fill_gap", "recurrence"]}
                    }
                }
            },
            "reasoning": {"type": "string"}
        }
    })
}

/// What the gap reasoner knows before asking the model.
struct GapFrame<'a> {
    category: Option<&'a CategoryDefinition>,
    known: Vec<String>,
    excluded: Vec<String>,
}

impl GapFrame<'_> {
    fn mode(&self) -> GapMode {
        if self.category.is_some() {
            GapMode::Structured
        } else {
            GapMode::Exploratory
        }
    }

    /// Declared fields neither known nor deflected, required first.
    fn missing(&self) -> Vec<String> {
        self.category
            .map(|c| {
                c.all_fields()
                    .filter(|f| !self.known.contains(f) && !self.excluded.contains(f))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn frame<'a>(state: &PipelineState, ctx: &StepContext<'a>) -> GapFrame<'a> {
    let turn = &state.turn_context;
    let category_id = state.effective_category();
    let category = category_id.and_then(|id| ctx.domain.category(id));
    let topic_change = state
        .classifier_output
        .as_ref()
        .is_some_and(|c| c.is_topic_change);

    let known = turn
        .previous_entry
        .as_ref()
        .filter(|e| !topic_change && Some(e.category_id.as_str()) == category_id)
        .map(|e| e.filled_fields())
        .unwrap_or_default();

    let mut excluded = turn.skipped_fields.clone();
    if state.intent() == Some(Intent::DontKnow) {
        if let Some(last) = turn.previous_turns.last() {
            excluded.extend(last.targeted_fields.iter().cloned());
        }
    }

    GapFrame { category, known, excluded }
}

#[async_trait]
impl PipelineStep for GapReasoner {
    fn kind(&self) -> StepKind {
        StepKind::GapReasoner
    }

    async fn run(&self, state: &PipelineState, ctx: &StepContext<'_>) -> Result<StepOutput> {
        let frame = frame(state, ctx);
        let context_summary = state
            .context_output
            .as_ref()
            .map_or("None.", |c| c.summary.as_str());

        let prompt = self.prompts.render_step(
            StepKind::GapReasoner,
            json!({
                "domain": ctx.domain,
                "mode": frame.mode(),
                "category": frame.category,
                "max_questions": ctx.settings.max_questions,
                "input": state.input.content,
                "known_fields": frame.known,
                "missing_fields": frame.missing(),
                "skipped_fields": frame.excluded,
                "asked_questions": state.turn_context.asked_questions,
                "recent_turns": recent_turns(state),
                "context_summary": context_summary,
            }),
        )?;

        let raw: RawGapAnalysis = self
            .gateway
            .invoke_and_validate(&self.kind().to_string(), &prompt, &self.contract)
            .await?;
        let analysis = refine(raw, &frame, state, ctx.settings.max_questions);

        debug!(
            session_id = %state.session_id,
            mode = %analysis.mode,
            gaps = analysis.gaps.len(),
            questions = analysis.questions.len(),
            "reasoned gaps"
        );
        Ok(StepOutput::GapReasoning(analysis))
    }
}

/// Filters, ranks and caps the model's proposal.
fn refine(
    raw: RawGapAnalysis,
    frame: &GapFrame<'_>,
    state: &PipelineState,
    max_questions: usize,
) -> GapAnalysis {
    let turn = &state.turn_context;
    let mode = frame.mode();
    let mut seen = HashSet::new();

    let mut questions: Vec<FollowUpQuestion> = raw
        .questions
        .into_iter()
        .filter(|q| !q.question.trim().is_empty() && !turn.was_asked(&q.question))
        .filter(|q| match &q.target_field {
            Some(field) => !frame.excluded.contains(field) && !frame.known.contains(field),
            None => true,
        })
        .filter(|q| seen.insert(q.question.trim().to_lowercase()))
        .collect();
    questions.sort_by_key(|q| q.answerability);

    let questions = match mode {
        GapMode::Structured => {
            questions.truncate(max_questions);
            questions
        }
        GapMode::Exploratory => with_recurrence_question(questions, state, max_questions),
    };

    let mut seen_gaps = HashSet::new();
    let mut gaps: Vec<String> = raw
        .gaps
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty() && !frame.known.contains(g) && !frame.excluded.contains(g))
        .filter(|g| seen_gaps.insert(g.clone()))
        .collect();
    if gaps.is_empty() && mode == GapMode::Structured {
        gaps = frame.missing();
    }

    GapAnalysis {
        mode,
        gaps,
        questions,
        reasoning: raw.reasoning,
    }
}

/// Keeps one recurrence question within the cap, adding a stock one when
/// the model gave none and an unused phrasing remains.
fn with_recurrence_question(
    questions: Vec<FollowUpQuestion>,
    state: &PipelineState,
    max_questions: usize,
) -> Vec<FollowUpQuestion> {
    if max_questions == 0 {
        return Vec::new();
    }

    let (recurrence, mut others): (Vec<_>, Vec<_>) = questions
        .into_iter()
        .partition(|q| q.purpose == QuestionPurpose::Recurrence);

    let recurring = recurrence.into_iter().next().or_else(|| {
        RECURRENCE_QUESTIONS
            .iter()
            .find(|q| !state.turn_context.was_asked(q))
            .map(|q| FollowUpQuestion {
                question: q.to_string(),
                target_field: None,
                answerability: Default::default(),
                purpose: QuestionPurpose::Recurrence,
            })
    });

    match recurring {
        Some(question) => {
            others.truncate(max_questions - 1);
            others.push(question);
        }
        None => others.truncate(max_questions),
    }
    others
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use gleaner_core::domain::UNCATEGORIZED;
    use gleaner_core::knowledge::{EntryDraft, KnowledgeEntry};
    use gleaner_core::pipeline::{Answerability, TurnContext, TurnSummary};

    fn question(text: &str, field: Option<&str>, answerability: Answerability) -> FollowUpQuestion {
        FollowUpQuestion {
            question: text.to_string(),
            target_field: field.map(str::to_string),
            answerability,
            purpose: QuestionPurpose::FillGap,
        }
    }

    fn refine_for(raw: RawGapAnalysis, state: &PipelineState) -> GapAnalysis {
        let (domain, persona, settings) = (domain(), persona(), settings());
        let ctx = StepContext { domain: &domain, persona: &persona, settings: &settings };
        let frame = frame(state, &ctx);
        refine(raw, &frame, state, settings.max_questions)
    }

    #[test]
    fn test_structured_questions_are_ranked_filtered_and_capped() {
        let previous = KnowledgeEntry::from_draft(EntryDraft {
            category_id: "history".to_string(),
            structured_data: json!({"period": "18th century"}).as_object().cloned().unwrap(),
            ..EntryDraft::default()
        });
        let ctx = TurnContext {
            turn_number: 2,
            is_follow_up: true,
            previous_entry: Some(previous),
            asked_questions: vec!["Who built it?".to_string()],
            ..TurnContext::default()
        };
        let state = state("It was the parish.", ctx)
            .apply(StepOutput::Classifier(classification("history", Intent::Content)));

        let raw = RawGapAnalysis {
            gaps: vec!["period".to_string(), "sources".to_string()],
            questions: vec![
                question("When was it built?", Some("period"), Answerability::High),
                question("Who built it?", Some("people"), Answerability::High),
                question("Any old photos?", None, Answerability::Low),
                question("Where did you read this?", Some("sources"), Answerability::Medium),
                question("Who lived nearby?", Some("people"), Answerability::High),
                question("Is there a plaque?", None, Answerability::Medium),
            ],
            reasoning: String::new(),
        };

        let analysis = refine_for(raw, &state);
        assert_eq!(analysis.mode, GapMode::Structured);
        assert_eq!(analysis.gaps, vec!["sources".to_string()]);
        assert_eq!(
            analysis.question_texts(),
            vec!["Who lived nearby?", "Where did you read this?", "Is there a plaque?"]
        );
    }

    #[test]
    fn test_dont_know_excludes_fields_targeted_last_turn() {
        let ctx = TurnContext {
            turn_number: 2,
            is_follow_up: true,
            previous_turns: vec![TurnSummary {
                turn_number: 1,
                input: "The old church".to_string(),
                intent: Some(Intent::Content),
                category_id: Some("history".to_string()),
                gaps: vec!["sources".to_string()],
                filled_fields: vec![],
                asked_questions: vec!["Where did you read this?".to_string()],
                targeted_fields: vec!["sources".to_string()],
            }],
            ..TurnContext::default()
        };
        let state = state("I don't know", ctx)
            .apply(StepOutput::Classifier(classification("history", Intent::DontKnow)));

        let raw = RawGapAnalysis {
            gaps: vec!["sources".to_string(), "period".to_string()],
            questions: vec![
                question("Is there any written record?", Some("sources"), Answerability::High),
                question("Roughly when was that?", Some("period"), Answerability::Medium),
            ],
            reasoning: String::new(),
        };

        let analysis = refine_for(raw, &state);
        assert_eq!(analysis.gaps, vec!["period".to_string()]);
        assert_eq!(analysis.question_texts(), vec!["Roughly when was that?"]);
    }

    #[test]
    fn test_exploratory_mode_always_asks_about_recurrence_within_cap() {
        let state = classified("We dance around the well", classification(UNCATEGORIZED, Intent::Content));
        let raw = RawGapAnalysis {
            gaps: vec!["timeframe".to_string(), "location".to_string()],
            questions: vec![
                question("When does it happen?", None, Answerability::High),
                question("Where is the well?", None, Answerability::High),
                question("Who takes part?", None, Answerability::Medium),
                question("What music is played?", None, Answerability::Low),
            ],
            reasoning: String::new(),
        };

        let analysis = refine_for(raw, &state);
        assert_eq!(analysis.mode, GapMode::Exploratory);
        assert_eq!(analysis.gaps, vec!["timeframe".to_string(), "location".to_string()]);
        assert_eq!(analysis.questions.len(), 3);
        let last = analysis.questions.last().unwrap();
        assert_eq!(last.purpose, QuestionPurpose::Recurrence);
        assert_eq!(last.question, RECURRENCE_QUESTIONS[0]);
    }

    #[test]
    fn test_repeated_gaps_are_listed_once() {
        let state = classified("The old church", classification("history", Intent::Content));
        let raw = RawGapAnalysis {
            gaps: vec![
                "sources".to_string(),
                "period".to_string(),
                " sources ".to_string(),
                "period".to_string(),
            ],
            questions: vec![],
            reasoning: String::new(),
        };

        let analysis = refine_for(raw, &state);
        assert_eq!(analysis.gaps, vec!["sources".to_string(), "period".to_string()]);
    }

    #[test]
    fn test_model_recurrence_question_is_kept_over_stock_one() {
        let state = classified("A fair by the river", classification(UNCATEGORIZED, Intent::Content));
        let mut recurring = question("Is the fair held every year?", None, Answerability::Low);
        recurring.purpose = QuestionPurpose::Recurrence;
        let raw = RawGapAnalysis {
            gaps: vec![],
            questions: vec![recurring],
            reasoning: String::new(),
        };

        let analysis = refine_for(raw, &state);
        assert_eq!(analysis.question_texts(), vec!["Is the fair held every year?"]);
    }
}
