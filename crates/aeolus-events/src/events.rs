//! Event payloads emitted by the crawl orchestrator and analysis pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted while a crawl runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrawlerEvent {
    Started {
        project_id: String,
        start_url: String,
        max_pages: usize,
        total: usize,
    },
    Progress {
        project_id: String,
        crawled: usize,
        total: usize,
        current_url: String,
    },
    PageCrawled {
        project_id: String,
        url: String,
        status_code: u16,
        response_time_ms: u64,
        crawled: usize,
        total: usize,
    },
    Completed {
        project_id: String,
        crawled: usize,
        total: usize,
    },
    Failed {
        project_id: String,
        crawled: usize,
        total: usize,
        error: String,
    },
}

/// Events emitted while an analysis batch runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyzerEvent {
    Started {
        project_id: String,
        total_pages: usize,
    },
    Progress {
        project_id: String,
        analyzed: usize,
        total: usize,
        current_url: String,
    },
    PageAnalyzed {
        project_id: String,
        url: String,
        global_score: u32,
    },
    Completed {
        project_id: String,
    },
    Failed {
        project_id: String,
        error: String,
    },
}

/// Any event the system emits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AeoEvent {
    Crawler(CrawlerEvent),
    Analyzer(AnalyzerEvent),
}

impl AeoEvent {
    /// Dotted event name, e.g. `crawler.page_crawled`
    pub fn event_type(&self) -> &'static str {
        match self {
            AeoEvent::Crawler(event) => match event {
                CrawlerEvent::Started { .. } => "crawler.started",
                CrawlerEvent::Progress { .. } => "crawler.progress",
                CrawlerEvent::PageCrawled { .. } => "crawler.page_crawled",
                CrawlerEvent::Completed { .. } => "crawler.completed",
                CrawlerEvent::Failed { .. } => "crawler.failed",
            },
            AeoEvent::Analyzer(event) => match event {
                AnalyzerEvent::Started { .. } => "analyzer.started",
                AnalyzerEvent::Progress { .. } => "analyzer.progress",
                AnalyzerEvent::PageAnalyzed { .. } => "analyzer.page_analyzed",
                AnalyzerEvent::Completed { .. } => "analyzer.completed",
                AnalyzerEvent::Failed { .. } => "analyzer.failed",
            },
        }
    }

    /// Project the event belongs to
    pub fn project_id(&self) -> &str {
        match self {
            AeoEvent::Crawler(event) => match event {
                CrawlerEvent::Started { project_id, .. }
                | CrawlerEvent::Progress { project_id, .. }
                | CrawlerEvent::PageCrawled { project_id, .. }
                | CrawlerEvent::Completed { project_id, .. }
                | CrawlerEvent::Failed { project_id, .. } => project_id,
            },
            AeoEvent::Analyzer(event) => match event {
                AnalyzerEvent::Started { project_id, .. }
                | AnalyzerEvent::Progress { project_id, .. }
                | AnalyzerEvent::PageAnalyzed { project_id, .. }
                | AnalyzerEvent::Completed { project_id }
                | AnalyzerEvent::Failed { project_id, .. } => project_id,
            },
        }
    }

    /// Whether this event terminates its project's stream for one stage
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AeoEvent::Crawler(CrawlerEvent::Completed { .. })
                | AeoEvent::Crawler(CrawlerEvent::Failed { .. })
                | AeoEvent::Analyzer(AnalyzerEvent::Completed { .. })
                | AeoEvent::Analyzer(AnalyzerEvent::Failed { .. })
        )
    }
}

impl From<CrawlerEvent> for AeoEvent {
    fn from(event: CrawlerEvent) -> Self {
        AeoEvent::Crawler(event)
    }
}

impl From<AnalyzerEvent> for AeoEvent {
    fn from(event: AnalyzerEvent) -> Self {
        AeoEvent::Analyzer(event)
    }
}

/// An event together with its emission metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub emitted_at: DateTime<Utc>,
    pub event: AeoEvent,
}

impl EventEnvelope {
    pub fn new(event: impl Into<AeoEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            emitted_at: Utc::now(),
            event: event.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_use_dotted_names() {
        let event: AeoEvent = CrawlerEvent::Started {
            project_id: "p1".to_string(),
            start_url: "https://example.com".to_string(),
            max_pages: 10,
            total: 1,
        }
        .into();
        assert_eq!(event.event_type(), "crawler.started");
        assert_eq!(event.project_id(), "p1");
        assert!(!event.is_terminal());

        let event: AeoEvent = AnalyzerEvent::Completed {
            project_id: "p1".to_string(),
        }
        .into();
        assert_eq!(event.event_type(), "analyzer.completed");
        assert!(event.is_terminal());
    }
}
