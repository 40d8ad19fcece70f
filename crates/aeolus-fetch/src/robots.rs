//! Per-host robots.txt policy
//!
//! Each host's robots.txt is fetched at most once (5 s timeout, no retries)
//! and the raw body cached. Any fetch failure, non-success status, or
//! unparseable URL caches an empty policy, which allows everything: a site
//! that cannot express a policy is crawled, never skipped.

use dashmap::DashMap;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Robots policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotsConfig {
    /// Timeout for the single robots.txt fetch per host
    pub fetch_timeout: Duration,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

/// Process-wide robots.txt cache and evaluator
#[derive(Debug)]
pub struct RobotsManager {
    client: Client,
    /// Host -> robots.txt body; empty body means allow-all
    cache: DashMap<String, String>,
}

impl RobotsManager {
    pub fn new(config: RobotsConfig) -> Self {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            cache: DashMap::new(),
        }
    }

    /// Whether `user_agent` may fetch `url` under the host's cached policy.
    ///
    /// The first call for a host fetches and caches its robots.txt;
    /// concurrent first calls may race the fetch, the first insert wins.
    pub async fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return true,
        };
        let Some(host) = parsed.host_str() else {
            return true;
        };
        let host_key = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let body = match self.cache.get(&host_key) {
            Some(entry) => entry.value().clone(),
            None => {
                let body = self.fetch_robots(&parsed, &host_key).await;
                self.cache.entry(host_key).or_insert(body).value().clone()
            }
        };

        if body.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&body, user_agent, url)
    }

    /// Raw cached robots.txt body for a host, if fetched already
    pub fn cached_body(&self, host: &str) -> Option<String> {
        self.cache.get(host).map(|entry| entry.value().clone())
    }

    async fn fetch_robots(&self, url: &Url, host_key: &str) -> String {
        let robots_url = format!(
            "{}://{}/robots.txt",
            url.scheme(),
            host_key
        );

        match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.text().await {
                    Ok(body) => {
                        debug!(host = host_key, bytes = body.len(), "Cached robots.txt");
                        body
                    }
                    Err(error) => {
                        warn!(host = host_key, error = %error, "robots.txt body read failed, allowing all");
                        String::new()
                    }
                }
            }
            Ok(response) => {
                debug!(host = host_key, status = response.status().as_u16(), "No robots.txt, allowing all");
                String::new()
            }
            Err(error) => {
                warn!(host = host_key, error = %error, "robots.txt fetch failed, allowing all");
                String::new()
            }
        }
    }
}

impl Default for RobotsManager {
    fn default() -> Self {
        Self::new(RobotsConfig::default())
    }
}
