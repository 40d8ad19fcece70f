//! Process-wide crawl rate limiter
//!
//! Two caps: a semaphore bounding global in-flight fetches, and a per-fetch
//! launch delay with uniform ±20% jitter. Permits are RAII values, so a
//! fetch that panics or errors still releases its slot.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use crate::{FetchError, Result};

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum concurrent fetches across the process
    pub max_concurrent: usize,
    /// Base delay applied before each fetch launch
    pub crawl_delay: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            crawl_delay: Duration::from_millis(250),
        }
    }
}

/// Held for the duration of one fetch; dropping it frees the slot
#[derive(Debug)]
pub struct RateLimitPermit {
    _permit: OwnedSemaphorePermit,
}

/// Semaphore-backed limiter shared by all fetching tasks
#[derive(Debug, Clone)]
pub struct CrawlRateLimiter {
    semaphore: Arc<Semaphore>,
    crawl_delay: Duration,
}

impl CrawlRateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            crawl_delay: config.crawl_delay,
        }
    }

    /// Wait for a fetch slot, then for the jittered launch delay.
    ///
    /// The delay is served while the slot is held, so a saturated crawl
    /// cannot burst past the delay by queueing on the semaphore alone.
    pub async fn acquire(&self) -> Result<RateLimitPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FetchError::LimiterClosed)?;

        let delay = self.jittered_delay();
        if !delay.is_zero() {
            trace!(delay_ms = delay.as_millis() as u64, "Rate limit launch delay");
            tokio::time::sleep(delay).await;
        }

        Ok(RateLimitPermit { _permit: permit })
    }

    /// Currently available fetch slots
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn jittered_delay(&self) -> Duration {
        if self.crawl_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = rand::thread_rng().gen_range(0.8..=1.2);
        Duration::from_millis((self.crawl_delay.as_millis() as f64 * factor) as u64)
    }
}
