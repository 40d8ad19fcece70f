//! Crawler configuration
//!
//! # Valid Configuration Ranges
//!
//! - `max_pages`: > 0
//! - `crawl_delay`: any; 0 disables the launch delay
//! - `max_concurrent`: > 0
//! - `timeout`: > 0
//! - `manual_urls`: non-empty when `mode` is manual
//!
//! Process-level environment overrides are applied by [`CrawlerConfig::apply_env`]:
//! `CRAWLER_USER_AGENT`, `CRAWLER_TIMEOUT_MS` (default 30000),
//! `CRAWLER_CONCURRENT_REQUESTS` (default 5).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::SpiderError;

/// How the crawl queue is seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Seed from the start URL and expand via sitemaps and outlinks
    #[default]
    Auto,
    /// Crawl exactly the supplied URL list
    Manual,
}

/// Main crawler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Hard cap on pages crawled (must be > 0)
    pub max_pages: usize,
    /// Base delay before each fetch launch; jittered ±20%
    pub crawl_delay: Duration,
    /// URLs must match at least one include pattern when any are set
    pub include_patterns: Vec<String>,
    /// URLs matching any exclude pattern are skipped
    pub exclude_patterns: Vec<String>,
    /// Whether to honor robots.txt
    pub respect_robots_txt: bool,
    /// User agent; `None` rotates through the built-in pool
    pub user_agent: Option<String>,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Reserved; not consulted in auto-sitemap mode
    pub max_depth: Option<usize>,
    /// Queue seeding mode
    pub mode: CrawlMode,
    /// Exact queue contents for manual mode
    pub manual_urls: Vec<String>,
    /// Maximum concurrent fetches (must be > 0)
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            crawl_delay: Duration::from_millis(250),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            respect_robots_txt: true,
            user_agent: None,
            timeout: Duration::from_secs(30),
            max_depth: None,
            mode: CrawlMode::Auto,
            manual_urls: Vec::new(),
            max_concurrent: 5,
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_crawl_delay(mut self, delay: Duration) -> Self {
        self.crawl_delay = delay;
        self
    }

    pub fn with_mode(mut self, mode: CrawlMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_manual_urls(mut self, urls: Vec<String>) -> Self {
        self.manual_urls = urls;
        self.mode = CrawlMode::Manual;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn with_respect_robots(mut self, respect: bool) -> Self {
        self.respect_robots_txt = respect;
        self
    }

    /// Overlay process-level environment variables.
    ///
    /// Unset or unparseable values leave the config untouched.
    pub fn apply_env(mut self) -> Self {
        if let Ok(agent) = std::env::var("CRAWLER_USER_AGENT") {
            if !agent.is_empty() {
                self.user_agent = Some(agent);
            }
        }
        if let Ok(timeout) = std::env::var("CRAWLER_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) if ms > 0 => self.timeout = Duration::from_millis(ms),
                _ => warn!(value = %timeout, "Ignoring invalid CRAWLER_TIMEOUT_MS"),
            }
        }
        if let Ok(concurrent) = std::env::var("CRAWLER_CONCURRENT_REQUESTS") {
            match concurrent.parse::<usize>() {
                Ok(n) if n > 0 => self.max_concurrent = n,
                _ => warn!(value = %concurrent, "Ignoring invalid CRAWLER_CONCURRENT_REQUESTS"),
            }
        }
        self
    }

    /// Check configuration consistency
    pub fn validate(&self) -> Result<(), SpiderError> {
        if self.max_pages == 0 {
            return Err(SpiderError::Config("max_pages must be > 0".to_string()));
        }
        if self.max_concurrent == 0 {
            return Err(SpiderError::Config(
                "max_concurrent must be > 0".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(SpiderError::Config("timeout must be > 0".to_string()));
        }
        if self.mode == CrawlMode::Manual && self.manual_urls.is_empty() {
            return Err(SpiderError::Config(
                "manual mode requires manual_urls".to_string(),
            ));
        }
        UrlFilters::compile(self).map(|_| ())
    }
}

/// Compiled include/exclude patterns
#[derive(Debug, Default)]
pub struct UrlFilters {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl UrlFilters {
    /// Compile the config's patterns, rejecting invalid regexes
    pub fn compile(config: &CrawlerConfig) -> Result<Self, SpiderError> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>, SpiderError> {
            patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|e| {
                        SpiderError::Config(format!("invalid pattern '{pattern}': {e}"))
                    })
                })
                .collect()
        };
        Ok(Self {
            include: compile(&config.include_patterns)?,
            exclude: compile(&config.exclude_patterns)?,
        })
    }

    /// Whether a URL passes the include/exclude filter.
    ///
    /// With no include patterns everything passes the include side; any
    /// exclude match rejects.
    pub fn matches(&self, url: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(url)) {
            return false;
        }
        !self.exclude.iter().any(|re| re.is_match(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(CrawlerConfig::default().validate().is_ok());
    }

    #[test]
    fn manual_mode_without_urls_is_rejected() {
        let config = CrawlerConfig::default().with_mode(CrawlMode::Manual);
        assert!(config.validate().is_err());

        let config =
            CrawlerConfig::default().with_manual_urls(vec!["https://x.com/a".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let config =
            CrawlerConfig::default().with_include_patterns(vec!["[unclosed".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn filters_apply_include_then_exclude() {
        let config = CrawlerConfig::default()
            .with_include_patterns(vec!["/blog/".to_string()])
            .with_exclude_patterns(vec!["/blog/draft".to_string()]);
        let filters = UrlFilters::compile(&config).unwrap();

        assert!(filters.matches("https://x.com/blog/post"));
        assert!(!filters.matches("https://x.com/about"));
        assert!(!filters.matches("https://x.com/blog/draft-1"));
    }

    #[test]
    fn empty_filters_match_everything() {
        let filters = UrlFilters::compile(&CrawlerConfig::default()).unwrap();
        assert!(filters.matches("https://anything.example/at/all"));
    }

    #[test]
    fn env_overlay_applies_and_ignores_garbage() {
        std::env::set_var("CRAWLER_USER_AGENT", "EnvBot/1.0");
        std::env::set_var("CRAWLER_TIMEOUT_MS", "12000");
        std::env::set_var("CRAWLER_CONCURRENT_REQUESTS", "not-a-number");

        let config = CrawlerConfig::default().apply_env();
        assert_eq!(config.user_agent.as_deref(), Some("EnvBot/1.0"));
        assert_eq!(config.timeout, Duration::from_millis(12_000));
        // Invalid value leaves the default in place
        assert_eq!(config.max_concurrent, 5);

        std::env::remove_var("CRAWLER_USER_AGENT");
        std::env::remove_var("CRAWLER_TIMEOUT_MS");
        std::env::remove_var("CRAWLER_CONCURRENT_REQUESTS");
    }
}
