//! Scripted collaborators for tests and offline runs.

use async_trait::async_trait;
use gleaner_core::llm::{LanguageModelClient, ModelError, ModelRequest, ModelResponse};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A language model client that replays canned responses in order and
/// records every request it receives.
///
/// Once the script runs out every call fails with a non-recoverable error.
#[derive(Default)]
pub struct ScriptedModelClient {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw text response.
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queues a JSON response.
    pub fn respond_json(self, value: Value) -> Self {
        self.respond(value.to_string())
    }

    /// Queues a failure.
    pub fn fail(self, error: ModelError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: Result<String, ModelError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModelClient for ScriptedModelClient {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self
            .script
            .lock()
            .map_err(|_| ModelError::fatal("script lock poisoned"))?
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(ModelResponse::text(text)),
            Some(Err(err)) => Err(err),
            None => Err(ModelError::fatal("scripted model client has no responses left")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
