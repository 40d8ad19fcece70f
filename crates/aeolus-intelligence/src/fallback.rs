//! Sequential fallback chain over (provider, model) routes
//!
//! Callers supply an ordered list of routes. A structured call walks the
//! chain in order, skipping unavailable providers, and returns the first
//! success. Once every route has failed, the last provider error propagates;
//! an empty or fully-unavailable chain reports `AllProvidersFailed`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::provider::{LlmClient, StructuredRequest};
use crate::{IntelligenceError, Result};

/// One (provider, model) pair in the chain
#[derive(Clone)]
pub struct ProviderRoute {
    pub provider: Arc<dyn LlmClient>,
    pub model: String,
}

impl ProviderRoute {
    pub fn new(provider: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

/// Statistics for fallback chain operations
#[derive(Debug, Clone, Default)]
pub struct FallbackStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Requests answered per provider name
    pub provider_usage: HashMap<String, u64>,
    /// Requests that needed more than the first route
    pub fallback_triggers: u64,
}

impl FallbackStats {
    fn record(&mut self, provider_name: Option<&str>, routes_tried: usize, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        if let Some(name) = provider_name {
            *self.provider_usage.entry(name.to_string()).or_insert(0) += 1;
        }
        if routes_tried > 1 {
            self.fallback_triggers += 1;
        }
    }
}

/// Ordered provider chain with per-route model selection
pub struct FallbackChain {
    routes: Vec<ProviderRoute>,
    stats: parking_lot::RwLock<FallbackStats>,
}

impl FallbackChain {
    pub fn new(routes: Vec<ProviderRoute>) -> Self {
        Self {
            routes,
            stats: parking_lot::RwLock::new(FallbackStats::default()),
        }
    }

    /// Append a route to the end of the chain
    pub fn push_route(&mut self, route: ProviderRoute) -> &mut Self {
        debug!(provider = route.provider.name(), model = %route.model, "Adding provider route");
        self.routes.push(route);
        self
    }

    /// Provider names in chain order
    pub fn provider_names(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|route| route.provider.name().to_string())
            .collect()
    }

    pub fn stats(&self) -> FallbackStats {
        self.stats.read().clone()
    }

    /// Walk the chain for one structured call.
    ///
    /// The request's `model` field is overridden per route; all other options
    /// pass through unchanged.
    pub async fn structured_completion(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value> {
        let mut last_error: Option<IntelligenceError> = None;
        let mut routes_tried = 0;

        for route in &self.routes {
            if !route.provider.is_available() {
                debug!(provider = route.provider.name(), "Skipping unavailable provider");
                continue;
            }
            routes_tried += 1;

            let mut routed = request.clone();
            routed.model = route.model.clone();

            match route.provider.structured_completion(routed).await {
                Ok(value) => {
                    if routes_tried > 1 {
                        debug!(
                            provider = route.provider.name(),
                            routes_tried, "Structured call succeeded after fallback"
                        );
                    }
                    self.stats
                        .write()
                        .record(Some(route.provider.name()), routes_tried, true);
                    return Ok(value);
                }
                Err(error) => {
                    warn!(
                        provider = route.provider.name(),
                        model = %route.model,
                        error = %error,
                        "Provider failed, trying next route"
                    );
                    last_error = Some(error);
                }
            }
        }

        self.stats.write().record(None, routes_tried, false);
        Err(last_error.unwrap_or(IntelligenceError::AllProvidersFailed))
    }
}

#[async_trait]
impl LlmClient for FallbackChain {
    fn name(&self) -> &str {
        "fallback-chain"
    }

    fn is_available(&self) -> bool {
        self.routes.iter().any(|route| route.provider.is_available())
    }

    async fn structured_completion(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value> {
        FallbackChain::structured_completion(self, request).await
    }
}
