//! In-memory repository backed by concurrent maps
//!
//! Used by tests and examples. Semantics match the contract: last-write-wins
//! upserts keyed by `(project_id, url)`, re-crawls reset the processed flag.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::page::CrawledPage;
use crate::repository::{CrawlRepository, CrawledPageUpsert, ProjectCrawlStats};
use crate::score::ContentScore;
use crate::{RepositoryError, RepositoryResult};

type ProjectUrlKey = (String, String);

/// DashMap-backed repository with no durability
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    pages: DashMap<ProjectUrlKey, CrawledPage>,
    scores: DashMap<ProjectUrlKey, ContentScore>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all pages stored for a project
    pub fn pages_for_project(&self, project_id: &str) -> Vec<CrawledPage> {
        self.pages
            .iter()
            .filter(|entry| entry.key().0 == project_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Snapshot of all scores stored for a project
    pub fn scores_for_project(&self, project_id: &str) -> Vec<ContentScore> {
        self.scores
            .iter()
            .filter(|entry| entry.key().0 == project_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Score stored for one URL, if any
    pub fn score_for_url(&self, project_id: &str, url: &str) -> Option<ContentScore> {
        self.scores
            .get(&(project_id.to_string(), url.to_string()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl CrawlRepository for InMemoryRepository {
    async fn upsert_crawled_page(
        &self,
        project_id: &str,
        url: &str,
        fields: CrawledPageUpsert,
    ) -> RepositoryResult<CrawledPage> {
        let key = (project_id.to_string(), url.to_string());
        let mut entry = self.pages.entry(key).or_insert_with(|| CrawledPage {
            id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            url: url.to_string(),
            crawled_at: fields.crawled_at,
            status_code: 0,
            response_time_ms: 0,
            html: String::new(),
            headers: Default::default(),
            metadata: Default::default(),
            content_hash: String::new(),
            error_message: None,
            is_processed: false,
        });

        let page = entry.value_mut();
        page.crawled_at = fields.crawled_at;
        page.status_code = fields.status_code;
        page.response_time_ms = fields.response_time_ms;
        page.html = fields.html;
        page.headers = fields.headers;
        page.metadata = fields.metadata;
        page.content_hash = fields.content_hash;
        page.error_message = fields.error_message;
        page.is_processed = false;

        debug!(project_id, url, status = page.status_code, "Upserted crawled page");
        Ok(page.clone())
    }

    async fn find_unprocessed_by_project(
        &self,
        project_id: &str,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<CrawledPage>> {
        let mut pages: Vec<CrawledPage> = self
            .pages
            .iter()
            .filter(|entry| entry.key().0 == project_id && !entry.value().is_processed)
            .map(|entry| entry.value().clone())
            .collect();

        pages.sort_by_key(|page| page.crawled_at);
        if let Some(limit) = limit {
            pages.truncate(limit);
        }
        Ok(pages)
    }

    async fn mark_processed(&self, page_id: Uuid, processed: bool) -> RepositoryResult<()> {
        for mut entry in self.pages.iter_mut() {
            if entry.value().id == page_id {
                entry.value_mut().is_processed = processed;
                return Ok(());
            }
        }
        Err(RepositoryError::NotFound(format!("page {page_id}")))
    }

    async fn upsert_content_score(&self, score: ContentScore) -> RepositoryResult<ContentScore> {
        let key = (score.project_id.clone(), score.url.clone());
        self.scores.insert(key, score.clone());
        Ok(score)
    }

    async fn get_project_crawl_stats(
        &self,
        project_id: &str,
    ) -> RepositoryResult<ProjectCrawlStats> {
        let mut stats = ProjectCrawlStats::default();
        let mut total_response_time = 0u64;

        for entry in self.pages.iter() {
            if entry.key().0 != project_id {
                continue;
            }
            let page = entry.value();
            stats.total_pages += 1;
            if page.is_fetch_failure() {
                stats.failed_pages += 1;
            } else {
                stats.successful_pages += 1;
            }
            if page.is_processed {
                stats.processed_pages += 1;
            }
            total_response_time += page.response_time_ms;
        }

        if stats.total_pages > 0 {
            stats.avg_response_time_ms = total_response_time as f64 / stats.total_pages as f64;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageMetadata;
    use chrono::Utc;
    use std::collections::HashMap;

    fn upsert_fields(status: u16) -> CrawledPageUpsert {
        CrawledPageUpsert {
            crawled_at: Utc::now(),
            status_code: status,
            response_time_ms: 42,
            html: "<html><body>hi</body></html>".to_string(),
            headers: HashMap::new(),
            metadata: PageMetadata::default(),
            content_hash: "abc".to_string(),
            error_message: if status == 0 {
                Some("timed out".to_string())
            } else {
                None
            },
        }
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins_and_keeps_id() {
        let repo = InMemoryRepository::new();
        let first = repo
            .upsert_crawled_page("p1", "https://x.com/a", upsert_fields(200))
            .await
            .unwrap();
        let second = repo
            .upsert_crawled_page("p1", "https://x.com/a", upsert_fields(404))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status_code, 404);
        assert_eq!(repo.pages_for_project("p1").len(), 1);
    }

    #[tokio::test]
    async fn recrawl_resets_processed_flag() {
        let repo = InMemoryRepository::new();
        let page = repo
            .upsert_crawled_page("p1", "https://x.com/a", upsert_fields(200))
            .await
            .unwrap();
        repo.mark_processed(page.id, true).await.unwrap();
        assert!(repo
            .find_unprocessed_by_project("p1", None)
            .await
            .unwrap()
            .is_empty());

        repo.upsert_crawled_page("p1", "https://x.com/a", upsert_fields(200))
            .await
            .unwrap();
        assert_eq!(
            repo.find_unprocessed_by_project("p1", None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn stats_count_failures_separately() {
        let repo = InMemoryRepository::new();
        repo.upsert_crawled_page("p1", "https://x.com/a", upsert_fields(200))
            .await
            .unwrap();
        repo.upsert_crawled_page("p1", "https://x.com/b", upsert_fields(0))
            .await
            .unwrap();
        repo.upsert_crawled_page("p2", "https://y.com/", upsert_fields(200))
            .await
            .unwrap();

        let stats = repo.get_project_crawl_stats("p1").await.unwrap();
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.successful_pages, 1);
        assert_eq!(stats.failed_pages, 1);
    }

    #[tokio::test]
    async fn unprocessed_respects_limit_and_order() {
        let repo = InMemoryRepository::new();
        for i in 0..5 {
            repo.upsert_crawled_page("p1", &format!("https://x.com/{i}"), upsert_fields(200))
                .await
                .unwrap();
        }
        let limited = repo
            .find_unprocessed_by_project("p1", Some(3))
            .await
            .unwrap();
        assert_eq!(limited.len(), 3);
    }
}
