use gleaner_core::error::GleanerError;
use gleaner_core::llm::ModelError;
use gleaner_interaction::contract::OutputContract;
use gleaner_interaction::retry::RetryPolicy;
use gleaner_interaction::testing::ScriptedModelClient;
use gleaner_interaction::{ModelGateway, Prompt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize, PartialEq)]
struct Reply {
    response: String,
}

fn contract() -> OutputContract {
    OutputContract::new(json!({
        "type": "object",
        "required": ["response"],
        "properties": {"response": {"type": "string", "minLength": 1}}
    }))
    .unwrap()
}

fn prompt() -> Prompt {
    Prompt {
        system_prompt: "You reply.".to_string(),
        user_message: "Say hello.".to_string(),
    }
}

fn fast_transport() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

/// Script of `invalid` bad payloads followed by one good one.
fn scripted(invalid: usize) -> Arc<ScriptedModelClient> {
    let bad = [
        "I'm not sure what you mean.",
        r#"{"response": ""}"#,
        r#"{"reply": "hello"}"#,
        r#"[1, 2, 3]"#,
    ];
    let client = ScriptedModelClient::new();
    for i in 0..invalid {
        client.push(Ok(bad[i % bad.len()].to_string()));
    }
    Arc::new(client.respond(r#"Sure: {"response": "hello"}"#))
}

#[tokio::test]
async fn test_returns_valid_value_after_n_invalid_payloads() {
    for max_retries in 0..4u32 {
        for invalid in 0..=max_retries as usize {
            let client = scripted(invalid);
            let gateway = ModelGateway::new(client.clone()).with_max_retries(max_retries);

            let reply: Reply = gateway
                .invoke_and_validate("responder", &prompt(), &contract())
                .await
                .unwrap();

            assert_eq!(reply.response, "hello");
            assert_eq!(client.call_count(), invalid + 1, "max_retries={max_retries} invalid={invalid}");
        }
    }
}

#[tokio::test]
async fn test_raises_validation_error_when_budget_is_short() {
    for max_retries in 0..3u32 {
        let invalid = max_retries as usize + 1;
        let client = scripted(invalid);
        let gateway = ModelGateway::new(client.clone()).with_max_retries(max_retries);

        let err = gateway
            .invoke_and_validate::<Reply>("responder", &prompt(), &contract())
            .await
            .unwrap_err();

        assert!(err.is_agent_output_invalid());
        assert!(!err.is_recoverable());
        assert_eq!(client.call_count(), max_retries as usize + 1);
    }
}

#[tokio::test]
async fn test_correction_lists_last_validation_errors() {
    let client = Arc::new(
        ScriptedModelClient::new()
            .respond(r#"{"reply": "hello"}"#)
            .respond(r#"{"response": "hello"}"#),
    );
    let gateway = ModelGateway::new(client.clone());

    let _: Reply = gateway
        .invoke_and_validate("responder", &prompt(), &contract())
        .await
        .unwrap();

    let requests = client.requests();
    assert_eq!(requests[0].user_message, "Say hello.");
    assert!(requests[1].user_message.starts_with("Say hello."));
    assert!(requests[1].user_message.contains("response"));
    assert!(requests[1].user_message.contains("Correction"));
    assert_eq!(requests[1].output_shape.as_ref(), Some(contract().schema()));
}

#[tokio::test]
async fn test_exhausted_validation_names_agent_and_errors() {
    let client = Arc::new(ScriptedModelClient::new().respond("nope").respond("still nope"));
    let gateway = ModelGateway::new(client);

    let err = gateway
        .invoke_and_validate::<Reply>("classifier", &prompt(), &contract())
        .await
        .unwrap_err();

    match err {
        GleanerError::AgentOutputInvalid { agent, errors } => {
            assert_eq!(agent, "classifier");
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("did not contain a JSON value"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_non_recoverable_failure_is_not_retried() {
    let client = Arc::new(
        ScriptedModelClient::new()
            .fail(ModelError::http(401, "invalid x-api-key", None))
            .respond(r#"{"response": "hello"}"#),
    );
    let gateway = ModelGateway::new(client.clone())
        .with_max_retries(3)
        .with_transport_policy(fast_transport());

    let err = gateway
        .invoke_and_validate::<Reply>("responder", &prompt(), &contract())
        .await
        .unwrap_err();

    assert!(matches!(err, GleanerError::Model { status_code: Some(401), recoverable: false, .. }));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_transient_failures_back_off_then_succeed() {
    let client = Arc::new(
        ScriptedModelClient::new()
            .fail(ModelError::http(529, "overloaded", None))
            .fail(ModelError::recoverable("connection reset by peer"))
            .respond(r#"{"response": "hello"}"#),
    );
    let gateway = ModelGateway::new(client.clone()).with_transport_policy(fast_transport());

    let reply: Reply = gateway
        .invoke_and_validate("responder", &prompt(), &contract())
        .await
        .unwrap();

    assert_eq!(reply.response, "hello");
    assert_eq!(client.call_count(), 3);
}

#[tokio::test]
async fn test_exhausted_transient_retries_are_recoverable() {
    let client = Arc::new(
        ScriptedModelClient::new()
            .fail(ModelError::http(503, "unavailable", None))
            .fail(ModelError::http(503, "unavailable", None))
            .fail(ModelError::http(503, "unavailable", None)),
    );
    let gateway = ModelGateway::new(client.clone())
        .with_max_retries(0)
        .with_transport_policy(fast_transport());

    let err = gateway
        .invoke_and_validate::<Reply>("responder", &prompt(), &contract())
        .await
        .unwrap_err();

    assert!(err.is_recoverable());
    assert_eq!(client.call_count(), 3);
}

#[tokio::test]
async fn test_recoverable_failure_spends_an_attempt() {
    let client = Arc::new(
        ScriptedModelClient::new()
            .fail(ModelError::recoverable("provider quota exhausted, try again"))
            .respond(r#"{"response": "ok"}"#),
    );
    let gateway = ModelGateway::new(client.clone())
        .with_max_retries(1)
        .with_transport_policy(fast_transport());

    let reply: Reply = gateway
        .invoke_and_validate("responder", &prompt(), &contract())
        .await
        .unwrap();

    assert_eq!(reply.response, "ok");
    assert_eq!(client.call_count(), 2);
    assert_eq!(client.requests()[1].user_message, "Say hello.");
}

#[tokio::test]
async fn test_recoverable_failure_on_last_attempt_stays_recoverable() {
    let client = Arc::new(
        ScriptedModelClient::new()
            .respond(r#"{"reply": "hello"}"#)
            .fail(ModelError::recoverable("provider quota exhausted, try again")),
    );
    let gateway = ModelGateway::new(client.clone())
        .with_max_retries(1)
        .with_transport_policy(fast_transport());

    let err = gateway
        .invoke_and_validate::<Reply>("responder", &prompt(), &contract())
        .await
        .unwrap_err();

    assert!(matches!(err, GleanerError::Model { recoverable: true, .. }));
    assert_eq!(client.call_count(), 2);
    assert!(client.requests()[1].user_message.contains("Correction"));
}
