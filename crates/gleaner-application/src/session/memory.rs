//! Conversational memory across turns.

use gleaner_core::pipeline::{Intent, TurnContext, TurnSummary};
use gleaner_core::session::{Session, Turn};

/// Compact view of a recorded turn.
///
/// Asked questions are the ones the persona actually surfaced; targeted
/// fields are the gap fields behind those questions.
pub fn summarize_turn(turn: &Turn) -> TurnSummary {
    let state = &turn.pipeline_result;
    let asked_questions = state
        .persona_output
        .as_ref()
        .map(|p| p.follow_up_questions.clone())
        .unwrap_or_default();

    let targeted_fields = state
        .gap_reasoning_output
        .as_ref()
        .map(|g| {
            g.questions
                .iter()
                .filter(|q| asked_questions.contains(&q.question))
                .filter_map(|q| q.target_field.clone())
                .collect()
        })
        .unwrap_or_default();

    TurnSummary {
        turn_number: turn.turn_number,
        input: turn.input.clone(),
        intent: turn.intent(),
        category_id: state.classifier_output.as_ref().map(|c| c.category_id.clone()),
        gaps: state
            .gap_reasoning_output
            .as_ref()
            .map(|g| g.gaps.clone())
            .unwrap_or_default(),
        filled_fields: state
            .structuring_output
            .as_ref()
            .map(|s| s.entry.filled_fields())
            .unwrap_or_default(),
        asked_questions,
        targeted_fields,
    }
}

/// Builds the context for the next turn of `session`.
///
/// A field counts as skipped when the user answered a question about it
/// with "I don't know", until some later turn fills it.
pub fn build_turn_context(session: &Session) -> TurnContext {
    let previous_turns: Vec<TurnSummary> = session.turns.iter().map(summarize_turn).collect();

    let mut asked_questions: Vec<String> = Vec::new();
    for question in previous_turns.iter().flat_map(|t| &t.asked_questions) {
        if !asked_questions.contains(question) {
            asked_questions.push(question.clone());
        }
    }

    let mut skipped_fields: Vec<String> = Vec::new();
    for pair in previous_turns.windows(2) {
        if pair[1].intent != Some(Intent::DontKnow) {
            continue;
        }
        for field in &pair[0].targeted_fields {
            if !skipped_fields.contains(field) {
                skipped_fields.push(field.clone());
            }
        }
    }
    if let Some(entry) = &session.current_entry {
        skipped_fields.retain(|f| !entry.has_field(f));
    }

    TurnContext {
        turn_number: session.next_turn_number(),
        is_follow_up: !session.turns.is_empty(),
        previous_turns,
        previous_entry: session.current_entry.clone(),
        asked_questions,
        skipped_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gleaner_core::pipeline::{
        AgentInput, Answerability, ClassifierResult, FollowUpQuestion, GapAnalysis, PersonaReply,
        PipelineState, QuestionPurpose, StepOutput,
    };
    use gleaner_core::session::SessionMetadata;

    fn turn(number: u32, input: &str, intent: Intent, asked: &[(&str, &str)]) -> Turn {
        let classification = ClassifierResult {
            category_id: "history".to_string(),
            subcategory_id: None,
            confidence: 0.9,
            intent,
            is_topic_change: false,
            reasoning: String::new(),
            summary: None,
            suggested_category_label: None,
        };
        let gap = GapAnalysis {
            questions: asked
                .iter()
                .map(|(q, field)| FollowUpQuestion {
                    question: q.to_string(),
                    target_field: Some(field.to_string()),
                    answerability: Answerability::High,
                    purpose: QuestionPurpose::FillGap,
                })
                .collect(),
            ..GapAnalysis::default()
        };
        let reply = PersonaReply {
            response: "ok".to_string(),
            follow_up_questions: asked.iter().map(|(q, _)| q.to_string()).collect(),
        };
        let state = PipelineState::new(AgentInput::new("s1", input), None, TurnContext::default())
            .apply(StepOutput::Classifier(classification))
            .apply(StepOutput::GapReasoning(gap))
            .apply(StepOutput::Persona(reply));
        Turn {
            turn_number: number,
            input: input.to_string(),
            pipeline_result: state,
            completeness: 0.0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_first_turn_context() {
        let session = Session::new(SessionMetadata::new("local-history", "archivist"));
        let ctx = build_turn_context(&session);
        assert_eq!(ctx.turn_number, 1);
        assert!(!ctx.is_follow_up);
        assert!(ctx.previous_turns.is_empty());
    }

    #[test]
    fn test_dont_know_marks_previous_targets_as_skipped() {
        let mut session = Session::new(SessionMetadata::new("local-history", "archivist"));
        session.turns.push(turn(
            1,
            "The old church was built in 1732",
            Intent::Content,
            &[("When exactly?", "period"), ("Where did you read this?", "sources")],
        ));
        session.turns.push(turn(2, "No idea, sorry", Intent::DontKnow, &[("Who built it?", "people")]));

        let ctx = build_turn_context(&session);
        assert_eq!(ctx.turn_number, 3);
        assert!(ctx.is_follow_up);
        assert_eq!(ctx.skipped_fields, vec!["period".to_string(), "sources".to_string()]);
        assert_eq!(
            ctx.asked_questions,
            vec!["When exactly?", "Where did you read this?", "Who built it?"]
        );
        assert_eq!(ctx.last_asked_question(), Some("Who built it?"));
    }

    #[test]
    fn test_filled_fields_are_no_longer_skipped() {
        let mut session = Session::new(SessionMetadata::new("local-history", "archivist"));
        session.turns.push(turn(1, "a", Intent::Content, &[("When exactly?", "period")]));
        session.turns.push(turn(2, "b", Intent::DontKnow, &[]));
        let mut entry = gleaner_core::knowledge::KnowledgeEntry::from_draft(Default::default());
        entry
            .structured_data
            .insert("period".to_string(), "1730s".into());
        session.current_entry = Some(entry);

        assert!(build_turn_context(&session).skipped_fields.is_empty());
    }
}
