//! Crawl orchestrator
//!
//! Owns the queue and visited set for each crawl invocation, interleaving
//! dequeue, policy checks, rate limiting, fetching, and outlink expansion.
//! Fetches run on their own tasks bounded by the rate limiter; all session
//! mutation happens on the orchestrating task.

use rand::SeedableRng;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use aeolus_events::{CrawlerEvent, EventBus};
use aeolus_fetch::{
    CrawlRateLimiter, FetchClient, FetchClientConfig, RateLimiterConfig, RobotsManager,
};
use aeolus_types::CrawlRepository;

use crate::config::{CrawlMode, CrawlerConfig, UrlFilters};
use crate::extractor::{ExtractedPage, PageExtractor};
use crate::session::{CrawlProgress, CrawlSession, CrawlStatus, SharedProgress};
use crate::sitemap::SitemapDiscovery;
use crate::url_utils::{homepage_of, normalize_url};
use crate::SpiderError;

type FetchOutcome = (String, Result<ExtractedPage, SpiderError>);

/// Crawl orchestrator service
///
/// One instance serves the whole process; per-crawl state lives in the
/// `crawl_website` invocation, with read-only progress snapshots exposed
/// through [`Crawler::progress`].
pub struct Crawler {
    config: CrawlerConfig,
    repository: Arc<dyn CrawlRepository>,
    events: Arc<EventBus>,
    robots: Arc<RobotsManager>,
    limiter: CrawlRateLimiter,
    active: dashmap::DashMap<String, Arc<SharedProgress>>,
}

impl Crawler {
    pub fn new(
        config: CrawlerConfig,
        repository: Arc<dyn CrawlRepository>,
        events: Arc<EventBus>,
    ) -> Result<Self, SpiderError> {
        config.validate()?;
        let limiter = CrawlRateLimiter::new(RateLimiterConfig {
            max_concurrent: config.max_concurrent,
            crawl_delay: config.crawl_delay,
        });
        Ok(Self {
            config,
            repository,
            events,
            robots: Arc::new(RobotsManager::default()),
            limiter,
            active: dashmap::DashMap::new(),
        })
    }

    /// Snapshot of a running crawl's progress, if one is active
    pub fn progress(&self, project_id: &str) -> Option<CrawlProgress> {
        self.active.get(project_id).map(|entry| entry.snapshot())
    }

    /// Request cancellation of a running crawl.
    ///
    /// The orchestrator completes in-flight fetches and then exits with
    /// `failed` status.
    pub fn cancel(&self, project_id: &str) {
        if let Some(entry) = self.active.get(project_id) {
            entry.cancel();
        }
    }

    /// Crawl a site for a project and return the final progress.
    ///
    /// Per-page failures are counted and never fail the crawl; only
    /// orchestrator-level errors (repository failures, cancellation)
    /// produce a `failed` terminal state.
    pub async fn crawl_website(
        &self,
        project_id: &str,
        start_url: &str,
    ) -> Result<CrawlProgress, SpiderError> {
        let progress = Arc::new(SharedProgress::new());
        self.active
            .insert(project_id.to_string(), progress.clone());
        progress.set_status(CrawlStatus::Running);

        let result = self
            .run_crawl(project_id, start_url, progress.clone())
            .await;

        let snapshot = match result {
            Ok(()) => {
                progress.set_status(CrawlStatus::Completed);
                let snapshot = progress.snapshot();
                info!(
                    project_id,
                    crawled = snapshot.crawled,
                    errors = snapshot.errors,
                    "Crawl completed"
                );
                self.events.emit(CrawlerEvent::Completed {
                    project_id: project_id.to_string(),
                    crawled: snapshot.crawled,
                    total: snapshot.total,
                });
                Ok(snapshot)
            }
            Err(error) => {
                progress.set_status(CrawlStatus::Failed);
                let snapshot = progress.snapshot();
                warn!(project_id, error = %error, "Crawl failed");
                self.events.emit(CrawlerEvent::Failed {
                    project_id: project_id.to_string(),
                    crawled: snapshot.crawled,
                    total: snapshot.total,
                    error: error.to_string(),
                });
                Err(error)
            }
        };

        // Queue, visited set, and progress are crawl-lifetime only
        self.active.remove(project_id);
        snapshot
    }

    async fn run_crawl(
        &self,
        project_id: &str,
        start_url: &str,
        progress: Arc<SharedProgress>,
    ) -> Result<(), SpiderError> {
        let filters = UrlFilters::compile(&self.config)?;
        let mut session = CrawlSession::new(self.config.max_pages, progress.clone());
        let mut rng = rand::rngs::StdRng::from_entropy();

        let start = normalize_url(start_url);

        match self.config.mode {
            CrawlMode::Manual => {
                for url in &self.config.manual_urls {
                    session.enqueue(normalize_url(url));
                }
                session.shuffle(&mut rng);
            }
            CrawlMode::Auto => {
                if url::Url::parse(&start).is_err() {
                    return Err(SpiderError::InvalidStartUrl(start_url.to_string()));
                }
                session.enqueue(start.clone());

                let discovered = SitemapDiscovery::new()
                    .discover(&start, &filters, self.config.max_pages)
                    .await;
                let sitemap_contributed = !discovered.is_empty();
                for url in discovered {
                    session.enqueue(url);
                }

                session.shuffle(&mut rng);
                if sitemap_contributed {
                    // Site-wide crawl: the origin root leads the queue
                    if let Some(homepage) = homepage_of(&start) {
                        session.promote_to_front(&homepage);
                    }
                } else {
                    // Link-expansion crawl: the seed URL leads
                    session.promote_to_front(&start);
                }
            }
        }

        self.events.emit(CrawlerEvent::Started {
            project_id: project_id.to_string(),
            start_url: start.clone(),
            max_pages: self.config.max_pages,
            total: session.total_target(),
        });

        let client = FetchClient::new(FetchClientConfig {
            user_agent: self.config.user_agent.clone(),
            timeout: self.config.timeout,
            ..Default::default()
        })
        .map_err(SpiderError::Fetch)?;
        let user_agent = client.user_agent().to_string();
        let extractor = PageExtractor::new(client, self.repository.clone());

        let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();
        let mut in_flight = 0usize;

        loop {
            if progress.is_cancelled() {
                // Complete in-flight fetches, then exit as failed
                while let Some(joined) = tasks.join_next().await {
                    in_flight = in_flight.saturating_sub(1);
                    if let Ok((url, outcome)) = joined {
                        self.handle_completion(project_id, &mut session, url, outcome)?;
                    }
                }
                return Err(SpiderError::Cancelled);
            }

            // Reap finished fetches without blocking
            while let Some(joined) = tasks.try_join_next() {
                in_flight = in_flight.saturating_sub(1);
                match joined {
                    Ok((url, outcome)) => {
                        self.handle_completion(project_id, &mut session, url, outcome)?
                    }
                    Err(join_error) => warn!(error = %join_error, "Fetch task aborted"),
                }
            }

            let budget_left =
                session.under_page_limit() && session.crawled() + in_flight < self.config.max_pages;

            if budget_left {
                if let Some(url) = session.pop() {
                    let url = normalize_url(&url);
                    if session.is_visited(&url) {
                        continue;
                    }
                    if self.config.respect_robots_txt
                        && !self.robots.is_allowed(&url, &user_agent).await
                    {
                        debug!(url = %url, "Skipped by robots policy");
                        continue;
                    }
                    if !filters.matches(&url) {
                        debug!(url = %url, "Skipped by URL patterns");
                        continue;
                    }

                    self.events.emit(CrawlerEvent::Progress {
                        project_id: project_id.to_string(),
                        crawled: session.crawled(),
                        total: session.total_target(),
                        current_url: url.clone(),
                    });

                    let permit = self.limiter.acquire().await?;
                    let task_extractor = extractor.clone();
                    let task_project = project_id.to_string();
                    tasks.spawn(async move {
                        let outcome = task_extractor
                            .fetch_and_extract(&task_project, &url)
                            .await;
                        drop(permit);
                        (url, outcome)
                    });
                    in_flight += 1;
                    continue;
                }
            }

            if in_flight == 0 {
                break;
            }
            if let Some(joined) = tasks.join_next().await {
                in_flight = in_flight.saturating_sub(1);
                match joined {
                    Ok((url, outcome)) => {
                        self.handle_completion(project_id, &mut session, url, outcome)?
                    }
                    Err(join_error) => warn!(error = %join_error, "Fetch task aborted"),
                }
            }
        }

        Ok(())
    }

    /// Fold one finished fetch back into the session
    fn handle_completion(
        &self,
        project_id: &str,
        session: &mut CrawlSession,
        url: String,
        outcome: Result<ExtractedPage, SpiderError>,
    ) -> Result<(), SpiderError> {
        match outcome {
            Ok(extracted) => {
                session.mark_visited(url.clone(), true);
                self.events.emit(CrawlerEvent::PageCrawled {
                    project_id: project_id.to_string(),
                    url,
                    status_code: extracted.page.status_code,
                    response_time_ms: extracted.page.response_time_ms,
                    crawled: session.crawled(),
                    total: session.total_target(),
                });

                if self.config.mode != CrawlMode::Manual && extracted.page.status_code == 200 {
                    for link in extracted.outlinks {
                        if !session.is_visited(&link) {
                            session.enqueue(link);
                        }
                    }
                }
                Ok(())
            }
            // Storage failures abort the crawl; nothing downstream can trust it
            Err(SpiderError::Repository(error)) => Err(SpiderError::Repository(error)),
            Err(error) => {
                debug!(url = %url, error = %error, "Per-page failure counted");
                session.mark_visited(url, false);
                Ok(())
            }
        }
    }
}
