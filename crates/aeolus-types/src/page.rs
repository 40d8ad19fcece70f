//! Crawled page records and extracted metadata
//!
//! A `CrawledPage` is written once per `(project_id, url)` and updated in
//! place on re-crawl. Fetch failures still produce a record: the extractor
//! stores a placeholder body with `status_code == 0` and an error message so
//! downstream consumers never observe a missing page for an attempted URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata extracted from a page's HTML head and body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Document title (title tag, og:title, twitter:title in that order)
    pub title: Option<String>,
    /// Meta description (description, og:description, twitter:description)
    pub description: Option<String>,
    /// Author name when declared
    pub author: Option<String>,
    /// Publication date when parseable
    pub publish_date: Option<DateTime<Utc>>,
    /// Last-modified date when parseable
    pub modified_date: Option<DateTime<Utc>>,
    /// Canonical URL when declared
    pub canonical_url: Option<String>,
    /// Declared document language
    pub lang: Option<String>,
    /// Parsed JSON-LD blocks, one value per script tag that parsed cleanly
    pub schema: Vec<serde_json::Value>,
}

/// A page fetched during a crawl, as persisted by the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPage {
    /// Repository-assigned record id
    pub id: Uuid,
    /// Project that owns this page
    pub project_id: String,
    /// Normalized URL, unique within the project
    pub url: String,
    /// When the fetch attempt completed
    pub crawled_at: DateTime<Utc>,
    /// HTTP status of the response; 0 when the fetch failed outright
    pub status_code: u16,
    /// Wall-clock fetch duration in milliseconds
    pub response_time_ms: u64,
    /// Raw response body; placeholder sentinel on failure, never empty
    pub html: String,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Extracted metadata
    pub metadata: PageMetadata,
    /// SHA-256 hex digest of the body
    pub content_hash: String,
    /// Failure description when the fetch did not produce a response
    pub error_message: Option<String>,
    /// Flipped by the analysis pipeline once the page has been scored
    pub is_processed: bool,
}

impl CrawledPage {
    /// Whether this record is a placeholder for a failed fetch
    pub fn is_fetch_failure(&self) -> bool {
        self.status_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_placeholder_is_detectable() {
        let page = CrawledPage {
            id: Uuid::new_v4(),
            project_id: "p1".to_string(),
            url: "https://example.com/x".to_string(),
            crawled_at: Utc::now(),
            status_code: 0,
            response_time_ms: 120,
            html: "<html><body></body></html>".to_string(),
            headers: HashMap::new(),
            metadata: PageMetadata::default(),
            content_hash: "00".to_string(),
            error_message: Some("connection reset".to_string()),
            is_processed: false,
        };

        assert!(page.is_fetch_failure());
        assert!(!page.html.is_empty());
        assert!(page.error_message.is_some());
    }
}
