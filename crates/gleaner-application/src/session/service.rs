//! Session lifecycle operations.
//!
//! The service computes the next state of a session and hands it to the
//! session repository. A turn that fails is never persisted.

use super::memory::build_turn_context;
use crate::orchestrator::PipelineOrchestrator;
use gleaner_core::config::{PipelineSettings, SessionSettings};
use gleaner_core::domain::{ConfigRepository, DomainConfig};
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::knowledge::{KnowledgeRecord, KnowledgeRepository, completeness_score};
use gleaner_core::persona::PersonaConfig;
use gleaner_core::pipeline::{AgentInput, Intent, PipelineState};
use gleaner_core::session::{
    InitSessionResponse, Session, SessionMetadata, SessionRepository, SessionResponse,
    SessionStatus, Turn,
};
use gleaner_interaction::PromptLibrary;
use gleaner_interaction::steps::StepContext;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    knowledge: Arc<dyn KnowledgeRepository>,
    config: Arc<dyn ConfigRepository>,
    orchestrator: Arc<PipelineOrchestrator>,
    prompts: Arc<PromptLibrary>,
    pipeline_settings: PipelineSettings,
    session_settings: SessionSettings,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        knowledge: Arc<dyn KnowledgeRepository>,
        config: Arc<dyn ConfigRepository>,
        orchestrator: Arc<PipelineOrchestrator>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            sessions,
            knowledge,
            config,
            orchestrator,
            prompts,
            pipeline_settings: PipelineSettings::default(),
            session_settings: SessionSettings::default(),
        }
    }

    pub fn with_settings(mut self, pipeline: PipelineSettings, session: SessionSettings) -> Self {
        self.pipeline_settings = pipeline;
        self.session_settings = session;
        self
    }

    /// Creates an empty session and greets the user. No turn is recorded.
    pub async fn init_session(&self, metadata: SessionMetadata) -> Result<InitSessionResponse> {
        let (domain, persona) = self.resolve(&metadata.domain, &metadata.persona)?;
        let greeting = self.prompts.render_greeting(&persona, &domain)?;

        let session = Session::new(metadata);
        self.sessions.save(&session).await?;
        info!(session_id = %session.id, domain = %domain.name, "session initialized");

        Ok(InitSessionResponse {
            session_id: session.id,
            greeting,
        })
    }

    /// Creates a session and runs its first turn.
    pub async fn start_session(
        &self,
        input: &str,
        metadata: SessionMetadata,
    ) -> Result<SessionResponse> {
        let session = Session::new(metadata);
        info!(session_id = %session.id, "session started");
        self.process_turn(session, None, input).await
    }

    /// Runs the next turn of an active session.
    pub async fn continue_session(&self, session_id: &str, input: &str) -> Result<SessionResponse> {
        let session = self.load(session_id).await?;
        if !session.is_active() {
            return Err(GleanerError::SessionNotActive {
                id: session.id,
                status: session.status.to_string(),
            });
        }
        let stored = session.clone();
        self.process_turn(session, Some(stored), input).await
    }

    /// Closes a session: complete when it collected an entry, abandoned otherwise.
    pub async fn end_session(&self, session_id: &str) -> Result<Session> {
        let mut session = self.load(session_id).await?;
        if !session.is_active() {
            return Err(GleanerError::SessionNotActive {
                id: session.id,
                status: session.status.to_string(),
            });
        }

        session.status = if session.current_entry.is_some() {
            SessionStatus::Complete
        } else {
            SessionStatus::Abandoned
        };
        session.touch();
        self.sessions.save(&session).await?;
        info!(session_id = %session.id, status = %session.status, turns = session.turns.len(), "session ended");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.load(session_id).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.sessions.list_all().await
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| GleanerError::not_found("Session", session_id))
    }

    fn resolve(&self, domain: &str, persona: &str) -> Result<(DomainConfig, PersonaConfig)> {
        let domain = self
            .config
            .domain(domain)
            .ok_or_else(|| GleanerError::config(format!("unknown domain '{domain}'")))?;
        let persona = self
            .config
            .persona(persona)
            .ok_or_else(|| GleanerError::config(format!("unknown persona '{persona}'")))?;
        domain.ensure_usable()?;
        Ok((domain, persona))
    }

    /// Runs one turn. `stored` is the persisted version of `session`, or
    /// `None` when the session does not exist in storage yet.
    async fn process_turn(
        &self,
        mut session: Session,
        stored: Option<Session>,
        input: &str,
    ) -> Result<SessionResponse> {
        let (domain, persona) =
            self.resolve(&session.domain_config_name, &session.persona_config_name)?;
        let ctx = StepContext {
            domain: &domain,
            persona: &persona,
            settings: &self.pipeline_settings,
        };

        let turn_context = build_turn_context(&session);
        let turn_number = turn_context.turn_number;
        let state = self
            .orchestrator
            .run_turn(
                AgentInput::new(&session.id, input),
                session.active_category().map(str::to_string),
                turn_context,
                &ctx,
            )
            .await?;

        let produced_entry = apply_turn(&mut session, &state);
        let completeness = session
            .current_entry
            .as_ref()
            .map_or(0.0, |entry| completeness_score(entry, &domain));

        let response = self.respond(&session, &state, turn_number, completeness)?;
        session.turns.push(Turn {
            turn_number,
            input: input.to_string(),
            pipeline_result: state,
            completeness,
            created_at: chrono::Utc::now().to_rfc3339(),
        });
        session.touch();
        self.sessions.save(&session).await?;

        if produced_entry {
            if let Some(entry) = &session.current_entry {
                let record = KnowledgeRecord {
                    entry: entry.clone(),
                    session_id: session.id.clone(),
                    domain_name: domain.name.clone(),
                };
                if let Err(err) = self.knowledge.save(&record).await {
                    self.restore(&session.id, stored).await;
                    return Err(err);
                }
            }
        }

        info!(
            session_id = %session.id,
            turn = turn_number,
            intent = %response.intent,
            category = response.category_id.as_deref().unwrap_or("-"),
            completeness,
            "turn recorded"
        );
        Ok(response)
    }

    /// Puts the session back the way it was before a turn whose entry could
    /// not be stored.
    async fn restore(&self, session_id: &str, stored: Option<Session>) {
        let restored = match &stored {
            Some(previous) => self.sessions.save(previous).await,
            None => self.sessions.delete(session_id).await,
        };
        if let Err(err) = restored {
            warn!(session_id, "failed to roll back session after turn failure: {err}");
        }
    }

    fn respond(
        &self,
        session: &Session,
        state: &PipelineState,
        turn_number: u32,
        completeness: f64,
    ) -> Result<SessionResponse> {
        let classification = state
            .classifier_output
            .as_ref()
            .ok_or_else(|| GleanerError::internal("turn finished without classification"))?;
        let reply = state.persona_output.clone().unwrap_or_default();

        Ok(SessionResponse {
            session_id: session.id.clone(),
            turn_number,
            response: reply.response,
            follow_up_questions: reply.follow_up_questions,
            intent: classification.intent,
            category_id: session.active_category().map(str::to_string),
            is_topic_change: classification.is_topic_change,
            current_entry: session.current_entry.clone(),
            completeness,
            is_complete: completeness >= self.session_settings.completion_threshold,
            status: session.status,
        })
    }
}

/// Folds a finished turn into the session aggregate.
///
/// Only content turns touch the aggregate. The classification is replaced on
/// the first classification, on a topic change, or when uncategorized input
/// is refined into a real category; otherwise the prior one is kept.
/// Returns whether the turn produced an entry.
fn apply_turn(session: &mut Session, state: &PipelineState) -> bool {
    let Some(classification) = state.classifier_output.as_ref() else {
        return false;
    };
    if classification.intent != Intent::Content {
        debug!(session_id = %session.id, intent = %classification.intent, "aggregate left untouched");
        return false;
    }

    let replace = match session.classifier_result.as_ref() {
        None => true,
        Some(previous) => {
            classification.is_topic_change
                || (previous.is_uncategorized() && !classification.is_uncategorized())
        }
    };
    if replace {
        session.classifier_result = Some(classification.clone());
    }

    match &state.structuring_output {
        Some(output) => {
            session.current_entry = Some(output.entry.clone());
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gleaner_core::pipeline::{ClassifierResult, StepOutput, TurnContext};

    fn classification(category_id: &str, is_topic_change: bool, intent: Intent) -> ClassifierResult {
        ClassifierResult {
            category_id: category_id.to_string(),
            subcategory_id: None,
            confidence: 0.9,
            intent,
            is_topic_change,
            reasoning: String::new(),
            summary: None,
            suggested_category_label: None,
        }
    }

    fn turn_state(result: ClassifierResult) -> PipelineState {
        PipelineState::new(AgentInput::new("s1", "x"), None, TurnContext::default())
            .apply(StepOutput::Classifier(result))
    }

    fn history_session() -> Session {
        let mut session = Session::new(SessionMetadata::new("local-history", "archivist"));
        session.classifier_result = Some(classification("history", false, Intent::Content));
        session
    }

    #[test]
    fn test_topic_change_replaces_active_category() {
        let mut session = history_session();
        apply_turn(&mut session, &turn_state(classification("nature", true, Intent::Content)));
        assert_eq!(session.active_category(), Some("nature"));
    }

    #[test]
    fn test_without_topic_change_active_category_is_kept() {
        let mut session = history_session();
        apply_turn(&mut session, &turn_state(classification("nature", false, Intent::Content)));
        assert_eq!(session.active_category(), Some("history"));
    }

    #[test]
    fn test_conversational_turns_leave_aggregate_untouched() {
        let mut session = history_session();
        for intent in [Intent::Greeting, Intent::ProactiveRequest, Intent::DontKnow] {
            let produced = apply_turn(&mut session, &turn_state(classification("meta", true, intent)));
            assert!(!produced);
            assert_eq!(session.active_category(), Some("history"));
        }
    }

    #[test]
    fn test_uncategorized_session_is_refined() {
        let mut session = Session::new(SessionMetadata::new("local-history", "archivist"));
        session.classifier_result = Some(classification("uncategorized", false, Intent::Content));
        apply_turn(&mut session, &turn_state(classification("history", false, Intent::Content)));
        assert_eq!(session.active_category(), Some("history"));
    }
}
