//! # Aeolus Spider
//!
//! Crawl engine for the Aeolus AEO analyzer:
//!
//! - **URL normalization and dedup**: canonical forms shared by the queue,
//!   the visited set, and persistence
//! - **Sitemap-first discovery**: standard locations plus robots.txt
//!   `Sitemap:` directives, with sitemap-index recursion
//! - **Page extraction**: polite retrying fetches, metadata and outlink
//!   extraction, content hashing
//! - **Orchestration**: bounded-concurrency crawl loop with progress events
//!   and per-invocation session state

pub mod config;
pub mod core;
pub mod extractor;
pub mod session;
pub mod sitemap;
pub mod url_utils;

pub use config::{CrawlMode, CrawlerConfig, UrlFilters};
pub use core::Crawler;
pub use extractor::{ExtractedPage, PageExtractor};
pub use session::{CrawlProgress, CrawlSession, CrawlStatus, SharedProgress};
pub use sitemap::SitemapDiscovery;
pub use url_utils::{is_content_url, is_same_host, normalize_url};

use thiserror::Error;

/// Errors surfaced by the crawl engine
#[derive(Error, Debug)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid start URL: {0}")]
    InvalidStartUrl(String),

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Fetch layer error: {0}")]
    Fetch(#[from] aeolus_fetch::FetchError),

    #[error("Repository error: {0}")]
    Repository(#[from] aeolus_types::RepositoryError),
}
