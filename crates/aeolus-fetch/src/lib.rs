//! # Aeolus Fetch
//!
//! HTTP/network layer for the Aeolus crawler:
//!
//! - **Retrying client**: transport failures retried with exponential
//!   backoff; every HTTP status is a valid response, never an error
//! - **Robots policy**: per-host robots.txt cache with allow-on-failure
//! - **Rate limiter**: process-wide in-flight cap plus jittered launch delay
//! - **User-agent pool**: configured agent or a rotating pick

pub mod client;
pub mod limiter;
pub mod robots;

pub use client::{FetchClient, FetchClientConfig, FetchResponse, RetryConfig};
pub use limiter::{CrawlRateLimiter, RateLimitPermit, RateLimiterConfig};
pub use robots::{RobotsConfig, RobotsManager};

use thiserror::Error;

/// Errors surfaced by the fetch layer
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Transport failure fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Rate limiter closed")]
    LimiterClosed,
}

pub type Result<T> = std::result::Result<T, FetchError>;
