//! Persistence contract for crawled pages and content scores
//!
//! The storage engine is opaque to the crawl and analysis engines; both talk
//! to this trait only. Upserts are last-write-wins per `(project_id, url)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::page::{CrawledPage, PageMetadata};
use crate::score::ContentScore;
use crate::RepositoryResult;

/// Fields written when a crawl attempt for a URL completes
#[derive(Debug, Clone)]
pub struct CrawledPageUpsert {
    pub crawled_at: DateTime<Utc>,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub html: String,
    pub headers: HashMap<String, String>,
    pub metadata: PageMetadata,
    pub content_hash: String,
    pub error_message: Option<String>,
}

/// Aggregate crawl statistics for a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectCrawlStats {
    pub total_pages: u64,
    pub successful_pages: u64,
    pub failed_pages: u64,
    pub processed_pages: u64,
    pub avg_response_time_ms: f64,
}

/// Repository contract the crawl and analysis engines persist through
///
/// Implementations must be internally thread-safe; engines call them from
/// concurrent tasks without external locking.
#[async_trait]
pub trait CrawlRepository: Send + Sync {
    /// Insert or update the page for `(project_id, url)`.
    ///
    /// A re-crawl resets `is_processed` to false so the analysis pipeline
    /// picks the page up again. The stored record is returned.
    async fn upsert_crawled_page(
        &self,
        project_id: &str,
        url: &str,
        fields: CrawledPageUpsert,
    ) -> RepositoryResult<CrawledPage>;

    /// Pages not yet scored, oldest crawl first
    async fn find_unprocessed_by_project(
        &self,
        project_id: &str,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<CrawledPage>>;

    /// Flip the processed flag for a page
    async fn mark_processed(&self, page_id: Uuid, processed: bool) -> RepositoryResult<()>;

    /// Insert or replace the score for `(project_id, url)`
    async fn upsert_content_score(&self, score: ContentScore) -> RepositoryResult<ContentScore>;

    /// Aggregate crawl statistics for a project
    async fn get_project_crawl_stats(&self, project_id: &str)
        -> RepositoryResult<ProjectCrawlStats>;
}
