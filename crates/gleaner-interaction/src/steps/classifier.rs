use super::{PipelineStep, StepContext, recent_turns};
use crate::contract::OutputContract;
use crate::gateway::ModelGateway;
use crate::prompts::PromptLibrary;
use async_trait::async_trait;
use gleaner_core::config::PipelineSettings;
use gleaner_core::domain::{DomainConfig, META_CATEGORY, UNCATEGORIZED};
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::pipeline::{ClassifierResult, Intent, PipelineState, StepKind, StepOutput};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// Decides the intent of a turn and, for content, its category.
pub struct Classifier {
    gateway: Arc<ModelGateway>,
    prompts: Arc<PromptLibrary>,
    contract: OutputContract,
}

impl Classifier {
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
        "required": ["category_id", "confidence", "intent", "is_topic_change", "reasoning"],
        "properties": {
            "category_id": {"type": "string", "minLength": 1},
            "subcategory_id": {"type": ["string", "null"]},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "intent": {"enum": ["content", "greeting", "proactive_request", "dont_know"]},
            "is_topic_change": {"type": "boolean"},
            "reasoning": {"type": "string"},
            "summary": {"type": ["string", "null"]},
            "suggested_category_label": {"type": ["string", "null"]}
        }
    })
}

#[async_trait]
impl PipelineStep for Classifier {
    fn kind(&self) -> StepKind {
        StepKind::Classifier
    }

    async fn run(&self, state: &PipelineState, ctx: &StepContext<'_>) -> Result<StepOutput> {
        ctx.domain.ensure_usable()?;

        let turn = &state.turn_context;
        let prompt = self.prompts.render_step(
            StepKind::Classifier,
            json!({
                "domain": ctx.domain,
                "threshold": ctx.settings.uncategorized_confidence_threshold,
                "is_follow_up": turn.is_follow_up,
                "active_category": state.active_category,
                "last_question": turn.last_asked_question(),
                "recent_turns": recent_turns(state),
                "input": state.input.content,
            }),
        )?;

        let raw: ClassifierResult = self
            .gateway
            .invoke_and_validate(&self.kind().to_string(), &prompt, &self.contract)
            .await?;
        let result = normalize(raw, state, ctx.domain, ctx.settings)?;

        debug!(
            session_id = %state.session_id,
            intent = %result.intent,
            category = %result.category_id,
            confidence = result.confidence,
            topic_change = result.is_topic_change,
            "classified turn"
        );
        Ok(StepOutput::Classifier(result))
    }
}

/// Applies the classification rules the model is only asked to follow.
///
/// - greetings and proactive requests are filed under the meta category;
/// - "don't know" keeps the active category and is never a topic change;
/// - a category outside the configured set is fatal;
/// - low-confidence content becomes uncategorized;
/// - a follow-up turn without a topic change stays in the active category,
///   except that uncategorized input may be refined into a real category;
/// - summary and suggested label only survive on uncategorized results.
pub(crate) fn normalize(
    mut raw: ClassifierResult,
    state: &PipelineState,
    domain: &DomainConfig,
    settings: &PipelineSettings,
) -> Result<ClassifierResult> {
    let agent = StepKind::Classifier.to_string();
    let active = state.active_category.as_deref();
    let is_follow_up = state.turn_context.is_follow_up;

    raw.confidence = raw.confidence.clamp(0.0, 1.0);
    if !is_follow_up {
        raw.is_topic_change = false;
    }

    match raw.intent {
        Intent::Greeting | Intent::ProactiveRequest => {
            raw.category_id = META_CATEGORY.to_string();
            raw.subcategory_id = None;
            raw.is_topic_change = false;
        }
        Intent::DontKnow => {
            raw.is_topic_change = false;
            match active {
                Some(category) => raw.category_id = category.to_string(),
                None => ensure_known(&agent, &raw.category_id, domain)?,
            }
            if raw.is_meta() {
                raw.category_id = UNCATEGORIZED.to_string();
            }
        }
        Intent::Content => {
            ensure_known(&agent, &raw.category_id, domain)?;
            if raw.is_meta()
                || raw.confidence < settings.uncategorized_confidence_threshold
            {
                raw.category_id = UNCATEGORIZED.to_string();
                raw.subcategory_id = None;
            }

            if let Some(active) = active.filter(|_| is_follow_up) {
                if raw.category_id == active {
                    raw.is_topic_change = false;
                } else if !raw.is_topic_change {
                    let refines_uncategorized =
                        active == UNCATEGORIZED && raw.category_id != UNCATEGORIZED;
                    if !refines_uncategorized {
                        raw.category_id = active.to_string();
                    }
                }
            }
        }
    }

    if raw.category_id != UNCATEGORIZED {
        raw.summary = None;
        raw.suggested_category_label = None;
    }
    Ok(raw)
}

fn ensure_known(agent: &str, category_id: &str, domain: &DomainConfig) -> Result<()> {
    if domain.is_known_category(category_id) {
        Ok(())
    } else {
        Err(GleanerError::UnknownCategory {
            agent: agent.to_string(),
            category_id: category_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::testing::ScriptedModelClient;
    use gleaner_core::pipeline::{AgentInput, TurnContext};

    fn follow_up_state(active: &str) -> PipelineState {
        let ctx = TurnContext {
            turn_number: 2,
            is_follow_up: true,
            ..TurnContext::default()
        };
        PipelineState::new(AgentInput::new("s1", "x"), Some(active.to_string()), ctx)
    }

    fn norm(raw: ClassifierResult, state: &PipelineState) -> Result<ClassifierResult> {
        normalize(raw, state, &domain(), &settings())
    }

    #[test]
    fn test_greeting_is_filed_under_meta() {
        let mut raw = classification("history", Intent::Greeting);
        raw.is_topic_change = true;
        let result = norm(raw, &follow_up_state("history")).unwrap();
        assert_eq!(result.category_id, META_CATEGORY);
        assert!(!result.is_topic_change);
    }

    #[test]
    fn test_dont_know_keeps_active_category() {
        let mut raw = classification("nature", Intent::DontKnow);
        raw.is_topic_change = true;
        let result = norm(raw, &follow_up_state("history")).unwrap();
        assert_eq!(result.category_id, "history");
        assert!(!result.is_topic_change);
    }

    #[test]
    fn test_unknown_category_is_fatal() {
        let raw = classification("cooking", Intent::Content);
        let err = norm(raw, &state("x", TurnContext::first_turn())).unwrap_err();
        assert!(matches!(err, GleanerError::UnknownCategory { ref category_id, .. } if category_id == "cooking"));
    }

    #[test]
    fn test_content_filed_under_meta_becomes_uncategorized() {
        let raw = classification(META_CATEGORY, Intent::Content);
        let result = norm(raw, &state("x", TurnContext::first_turn())).unwrap();
        assert!(result.is_uncategorized());
        assert!(!result.is_meta());
    }

    #[test]
    fn test_low_confidence_becomes_uncategorized() {
        let mut raw = classification("history", Intent::Content);
        raw.confidence = 0.4;
        raw.summary = Some("a mill".to_string());
        let result = norm(raw, &state("x", TurnContext::first_turn())).unwrap();
        assert_eq!(result.category_id, UNCATEGORIZED);
        assert_eq!(result.summary.as_deref(), Some("a mill"));
    }

    #[test]
    fn test_topic_change_switches_category_only_when_flagged() {
        let mut changed = classification("nature", Intent::Content);
        changed.is_topic_change = true;
        let result = norm(changed, &follow_up_state("history")).unwrap();
        assert_eq!(result.category_id, "nature");
        assert!(result.is_topic_change);

        let unchanged = classification("nature", Intent::Content);
        let result = norm(unchanged, &follow_up_state("history")).unwrap();
        assert_eq!(result.category_id, "history");
    }

    #[test]
    fn test_uncategorized_session_may_be_refined() {
        let raw = classification("nature", Intent::Content);
        let result = norm(raw, &follow_up_state(UNCATEGORIZED)).unwrap();
        assert_eq!(result.category_id, "nature");
        assert!(!result.is_topic_change);
    }

    #[test]
    fn test_first_turn_is_never_a_topic_change() {
        let mut raw = classification("history", Intent::Content);
        raw.is_topic_change = true;
        raw.summary = Some("dropped".to_string());
        let result = norm(raw, &state("x", TurnContext::first_turn())).unwrap();
        assert!(!result.is_topic_change);
        assert!(result.summary.is_none());
    }

    #[tokio::test]
    async fn test_run_invokes_model_with_schema_hint() {
        let client = Arc::new(ScriptedModelClient::new().respond(
            "```json\n{\"category_id\": \"history\", \"confidence\": 0.92, \"intent\": \"content\", \
             \"is_topic_change\": false, \"reasoning\": \"a building's past\"}\n```",
        ));
        let gateway = Arc::new(ModelGateway::new(client.clone()));
        let classifier = Classifier::new(gateway, Arc::new(PromptLibrary::new().unwrap())).unwrap();
        let (domain, persona, settings) = (domain(), persona(), settings());
        let ctx = StepContext { domain: &domain, persona: &persona, settings: &settings };

        let output = classifier
            .run(&state("The old church was built in 1732.", TurnContext::first_turn()), &ctx)
            .await
            .unwrap();

        let StepOutput::Classifier(result) = output else {
            panic!("expected classifier output");
        };
        assert_eq!(result.category_id, "history");
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].output_shape.is_some());
        assert!(requests[0].user_message.contains("The old church"));
    }

    #[tokio::test]
    async fn test_domain_without_categories_fails_before_model_call() {
        let client = Arc::new(ScriptedModelClient::new());
        let gateway = Arc::new(ModelGateway::new(client.clone()));
        let classifier = Classifier::new(gateway, Arc::new(PromptLibrary::new().unwrap())).unwrap();
        let mut domain = domain();
        domain.categories.clear();
        let (persona, settings) = (persona(), settings());
        let ctx = StepContext { domain: &domain, persona: &persona, settings: &settings };

        let err = classifier
            .run(&state("hello", TurnContext::first_turn()), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_config());
        assert_eq!(client.call_count(), 0);
    }
}
