//! Core LLM client trait and structured request types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// Request for a schema-constrained completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredRequest {
    pub id: Uuid,
    /// Prompt presented to the model
    pub prompt: String,
    /// JSON schema the response value must conform to
    pub schema: serde_json::Value,
    /// Model identifier, interpreted by the provider
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether the provider may browse while answering
    pub web_access: bool,
}

impl StructuredRequest {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            schema,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            web_access: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_web_access(mut self, web_access: bool) -> Self {
        self.web_access = web_access;
        self
    }
}

/// Capability every LLM provider adapter exposes
///
/// Implementations are expected to be internally thread-safe and to honor
/// their own request timeouts; callers treat a slow provider the same as a
/// failed one and move down the fallback chain.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Stable provider name used in logs and stats
    fn name(&self) -> &str;

    /// Whether the provider is currently usable (credentials, quota)
    fn is_available(&self) -> bool {
        true
    }

    /// Perform a structured call and return a value conforming to the schema
    async fn structured_completion(&self, request: StructuredRequest)
        -> Result<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_options() {
        let request = StructuredRequest::new(
            "answer-model-small",
            "Categorize this page",
            serde_json::json!({"type": "object"}),
        )
        .with_temperature(0.1)
        .with_max_tokens(256)
        .with_web_access(false);

        assert_eq!(request.model, "answer-model-small");
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.max_tokens, Some(256));
        assert!(!request.web_access);
    }
}
