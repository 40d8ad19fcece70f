//! Scripted mock provider for tests
//!
//! Responses and failures are queued ahead of time; once the script runs dry
//! the provider serves its default response. Received requests are recorded
//! so tests can assert on prompts and routed models.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::provider::{LlmClient, StructuredRequest};
use crate::{IntelligenceError, Result};

type ScriptedOutcome = std::result::Result<serde_json::Value, IntelligenceError>;

/// Mock LLM provider with a scripted outcome queue
pub struct MockLlmProvider {
    name: String,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    requests: Mutex<Vec<StructuredRequest>>,
    default_response: serde_json::Value,
    available: std::sync::atomic::AtomicBool,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::named("mock")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            default_response: serde_json::json!({}),
            available: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub fn with_default_response(mut self, response: serde_json::Value) -> Self {
        self.default_response = response;
        self
    }

    /// Queue a successful response
    pub fn push_response(&self, response: serde_json::Value) {
        self.script.lock().push_back(Ok(response));
    }

    /// Queue a failure
    pub fn push_failure(&self, error: IntelligenceError) {
        self.script.lock().push_back(Err(error));
    }

    /// Toggle availability as seen by fallback chains
    pub fn set_available(&self, available: bool) {
        self.available
            .store(available, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<StructuredRequest> {
        self.requests.lock().last().cloned()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(std::sync::atomic::Ordering::Relaxed)
    }

    async fn structured_completion(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value> {
        self.requests.lock().push(request);
        match self.script.lock().pop_front() {
            Some(outcome) => outcome,
            None => Ok(self.default_response.clone()),
        }
    }
}
