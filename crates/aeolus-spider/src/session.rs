//! Per-crawl session state
//!
//! A `CrawlSession` is owned by one `crawl_website` invocation and mutated
//! only by it. Status queries go through shared atomic counters that the
//! session publishes to; readers always get a consistent snapshot and never
//! touch the queue or visited set.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Crawl lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Read-only progress snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub crawled: usize,
    pub errors: usize,
    pub total: usize,
    pub status: CrawlStatus,
}

/// Shared, atomically-updated progress published by a running session
#[derive(Debug)]
pub struct SharedProgress {
    crawled: AtomicUsize,
    errors: AtomicUsize,
    total: AtomicUsize,
    status: RwLock<CrawlStatus>,
    cancelled: AtomicBool,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self {
            crawled: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            status: RwLock::new(CrawlStatus::Idle),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> CrawlProgress {
        CrawlProgress {
            crawled: self.crawled.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
            status: *self.status.read(),
        }
    }

    pub fn set_status(&self, status: CrawlStatus) {
        *self.status.write() = status;
    }

    /// Request cancellation; the orchestrator observes this between fetches
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for SharedProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue and dedup state for one crawl invocation
#[derive(Debug)]
pub struct CrawlSession {
    /// URLs waiting to be fetched, in crawl order
    to_crawl: VecDeque<String>,
    /// Every URL ever enqueued; collapses duplicate insertions
    seen: HashSet<String>,
    /// URLs whose fetch attempt completed (success or failure)
    visited: HashSet<String>,
    max_pages: usize,
    crawled: usize,
    errors: usize,
    progress: Arc<SharedProgress>,
}

impl CrawlSession {
    pub fn new(max_pages: usize, progress: Arc<SharedProgress>) -> Self {
        Self {
            to_crawl: VecDeque::new(),
            seen: HashSet::new(),
            visited: HashSet::new(),
            max_pages,
            crawled: 0,
            errors: 0,
            progress,
        }
    }

    /// Enqueue a normalized URL; duplicates collapse via set semantics
    pub fn enqueue(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.to_crawl.push_back(url);
        self.publish();
        true
    }

    /// Place a URL at the queue head, enqueueing it if absent
    pub fn promote_to_front(&mut self, url: &str) {
        if let Some(pos) = self.to_crawl.iter().position(|queued| queued == url) {
            if pos > 0 {
                if let Some(item) = self.to_crawl.remove(pos) {
                    self.to_crawl.push_front(item);
                }
            }
        } else if !self.visited.contains(url) {
            self.seen.insert(url.to_string());
            self.to_crawl.push_front(url.to_string());
            self.publish();
        }
    }

    /// Shuffle every queued URL uniformly at random
    pub fn shuffle(&mut self, rng: &mut impl rand::Rng) {
        let mut urls: Vec<String> = self.to_crawl.drain(..).collect();
        rand::seq::SliceRandom::shuffle(urls.as_mut_slice(), rng);
        self.to_crawl = urls.into();
    }

    pub fn pop(&mut self) -> Option<String> {
        self.to_crawl.pop_front()
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Record a completed fetch attempt
    pub fn mark_visited(&mut self, url: String, success: bool) {
        self.visited.insert(url);
        if success {
            self.crawled += 1;
        } else {
            self.errors += 1;
        }
        self.publish();
    }

    pub fn crawled(&self) -> usize {
        self.crawled
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn queued(&self) -> usize {
        self.to_crawl.len()
    }

    /// Whether another page may still be fetched
    pub fn under_page_limit(&self) -> bool {
        self.crawled < self.max_pages
    }

    /// Current completion target: work finished plus work still queued,
    /// capped by the page limit
    pub fn total_target(&self) -> usize {
        (self.crawled + self.errors + self.to_crawl.len()).min(self.max_pages)
    }

    /// Queued URLs in order, for tests and diagnostics
    pub fn queued_urls(&self) -> Vec<String> {
        self.to_crawl.iter().cloned().collect()
    }

    fn publish(&self) {
        self.progress.crawled.store(self.crawled, Ordering::Relaxed);
        self.progress.errors.store(self.errors, Ordering::Relaxed);
        self.progress
            .total
            .store(self.total_target(), Ordering::Relaxed);
    }
}
