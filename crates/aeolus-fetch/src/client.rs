//! Retrying HTTP client
//!
//! Transport failures (timeouts, connection errors) are retried with
//! exponential backoff. HTTP status codes are never treated as failures:
//! a 404 or 500 is a valid crawl observation and is returned as-is.

use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{FetchError, Result};

/// Fixed pool used when no user agent is configured
const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Retry configuration with exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Backoff multiplier applied per attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

/// Configuration for the fetch client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchClientConfig {
    /// User agent; `None` picks randomly from the built-in pool
    pub user_agent: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry behavior for transport failures
    pub retry: RetryConfig,
}

impl Default for FetchClientConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// A completed HTTP exchange, whatever the status code
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
    pub response_time_ms: u64,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client with retry semantics suited to crawling
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    retry: RetryConfig,
    user_agent: String,
}

impl FetchClient {
    pub fn new(config: FetchClientConfig) -> Result<Self> {
        let user_agent = config.user_agent.clone().unwrap_or_else(|| {
            USER_AGENT_POOL
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(USER_AGENT_POOL[0])
                .to_string()
        });

        let client = Client::builder()
            .user_agent(&user_agent)
            .gzip(true)
            .brotli(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            retry: config.retry,
            user_agent,
        })
    }

    /// The user agent this client sends
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetch a URL, retrying transport failures.
    ///
    /// Non-2xx statuses are returned as normal responses. Only transport
    /// errors (timeout, connect, body read) count against the retry budget.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let mut last_error: Option<reqwest::Error> = None;

        for attempt in 0..self.retry.max_attempts.max(1) {
            if attempt > 0 {
                let delay = self.calculate_delay(attempt - 1);
                debug!(url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Retrying fetch");
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let headers = response
                        .headers()
                        .iter()
                        .map(|(name, value)| {
                            (
                                name.as_str().to_lowercase(),
                                value.to_str().unwrap_or_default().to_string(),
                            )
                        })
                        .collect();

                    match response.text().await {
                        Ok(body) => {
                            return Ok(FetchResponse {
                                status,
                                headers,
                                body,
                                response_time_ms: start.elapsed().as_millis() as u64,
                            });
                        }
                        Err(error) => {
                            warn!(url, attempt = attempt + 1, error = %error, "Body read failed");
                            last_error = Some(error);
                        }
                    }
                }
                Err(error) => {
                    warn!(url, attempt = attempt + 1, error = %error, "Fetch attempt failed");
                    last_error = Some(error);
                }
            }
        }

        Err(FetchError::Transport {
            url: url.to_string(),
            // max_attempts >= 1, so at least one attempt recorded an error
            source: last_error.expect("retry loop ran at least once"),
        })
    }

    fn calculate_delay(&self, completed_attempts: u32) -> Duration {
        let millis = self.retry.initial_delay.as_millis() as f64
            * self.retry.backoff_multiplier.powi(completed_attempts as i32);
        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn delay_follows_exponential_backoff() {
        let client = FetchClient::new(FetchClientConfig::default()).unwrap();
        assert_eq!(client.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(client.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(client.calculate_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn configured_user_agent_wins_over_pool() {
        let client = FetchClient::new(FetchClientConfig {
            user_agent: Some("AeolusTest/1.0".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.user_agent(), "AeolusTest/1.0");
    }

    #[test]
    fn pool_pick_is_from_the_fixed_pool() {
        let client = FetchClient::new(FetchClientConfig::default()).unwrap();
        assert!(USER_AGENT_POOL.contains(&client.user_agent()));
    }

    #[tokio::test]
    async fn non_success_status_is_a_valid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchClientConfig::default()).unwrap();
        let response = client
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.body, "not here");
    }

    #[tokio::test]
    async fn headers_are_lowercased() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Custom-Header", "value")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchClientConfig::default()).unwrap();
        let response = client.fetch(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(response.headers.get("x-custom-header").map(String::as_str), Some("value"));
    }

    #[tokio::test]
    async fn transport_failure_exhausts_retries() {
        // Nothing listens on this port; connect fails fast on loopback.
        let client = FetchClient::new(FetchClientConfig {
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(10),
                backoff_multiplier: 2.0,
            },
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();

        let result = client.fetch("http://127.0.0.1:9/unreachable").await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
