//! # Aeolus Intelligence
//!
//! Vendor-agnostic LLM abstraction for the analysis pipeline. Provider SDKs
//! live outside this workspace; callers depend on the `LlmClient` capability
//! and compose providers into a sequential fallback chain. Every call is a
//! structured call: the caller supplies a JSON schema and receives a value
//! conforming to it, or an error once the whole chain is exhausted.

pub mod fallback;
pub mod provider;

#[cfg(any(test, feature = "mock"))]
pub mod mock_provider;

pub use fallback::{FallbackChain, FallbackStats, ProviderRoute};
pub use provider::{LlmClient, StructuredRequest};

#[cfg(any(test, feature = "mock"))]
pub use mock_provider::MockLlmProvider;

use thiserror::Error;

/// Main error type for the intelligence layer
#[derive(Error, Debug, Clone)]
pub enum IntelligenceError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Timeout: operation took longer than {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("All providers failed in fallback chain")]
    AllProvidersFailed,

    #[error("Response did not conform to the requested schema: {0}")]
    SchemaMismatch(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, IntelligenceError>;
