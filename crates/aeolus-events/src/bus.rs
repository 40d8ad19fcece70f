//! Broadcast event bus
//!
//! Routes envelopes to any number of subscribers over a tokio broadcast
//! channel. Emission is fire-and-forget: a send with no subscribers, or to a
//! lagged subscriber, is logged and dropped rather than surfaced to the
//! producer.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::{AeoEvent, EventEnvelope};

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Maximum number of envelopes buffered per subscriber
    pub buffer_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { buffer_size: 1024 }
    }
}

/// Central bus for crawl and analysis progress events
#[derive(Debug)]
pub struct EventBus {
    config: EventBusConfig,
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _receiver) = broadcast::channel(config.buffer_size);
        Self { config, sender }
    }

    /// Emit an event. Never fails; missing subscribers only log.
    pub fn emit(&self, event: impl Into<AeoEvent>) {
        let envelope = EventEnvelope::new(event);
        match self.sender.send(envelope) {
            Ok(subscriber_count) => {
                debug!(subscribers = subscriber_count, "Event emitted");
            }
            Err(broadcast::error::SendError(envelope)) => {
                debug!(
                    event_type = envelope.event.event_type(),
                    "Event dropped, no active subscribers"
                );
            }
        }
    }

    /// Subscribe to events matching the given type patterns.
    ///
    /// Patterns are exact names (`crawler.started`), prefixes (`crawler.*`),
    /// or `*` for everything. An empty pattern list matches everything.
    pub fn subscribe(&self, patterns: Vec<String>) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
            patterns,
        }
    }

    /// Subscribe to all events
    pub fn subscribe_all(&self) -> EventSubscription {
        self.subscribe(Vec::new())
    }

    /// Current bus statistics
    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            buffer_size: self.config.buffer_size,
            current_subscribers: self.sender.receiver_count(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event bus statistics
#[derive(Debug, Clone)]
pub struct EventBusStats {
    pub buffer_size: usize,
    pub current_subscribers: usize,
}

/// A filtered stream of event envelopes
pub struct EventSubscription {
    receiver: broadcast::Receiver<EventEnvelope>,
    patterns: Vec<String>,
}

impl EventSubscription {
    /// Next matching envelope; `None` once the bus is dropped.
    ///
    /// Lagged deliveries are logged and skipped so a slow subscriber sees a
    /// gap, never an error.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => {
                    if self.matches(envelope.event.event_type()) {
                        return Some(envelope);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(lagged_events = count, "Event subscriber lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn matches(&self, event_type: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.iter().any(|pattern| {
            if pattern == "*" {
                return true;
            }
            if let Some(prefix) = pattern.strip_suffix('*') {
                return event_type.starts_with(prefix);
            }
            event_type == pattern
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AnalyzerEvent, CrawlerEvent};

    fn started(project: &str) -> CrawlerEvent {
        CrawlerEvent::Started {
            project_id: project.to_string(),
            start_url: "https://example.com".to_string(),
            max_pages: 5,
            total: 1,
        }
    }

    #[tokio::test]
    async fn emit_without_subscribers_does_not_fail() {
        let bus = EventBus::new();
        bus.emit(started("p1"));
        assert_eq!(bus.stats().current_subscribers, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_emitted_events_in_order() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();

        bus.emit(started("p1"));
        bus.emit(CrawlerEvent::Completed {
            project_id: "p1".to_string(),
            crawled: 1,
            total: 1,
        });

        let first = sub.recv().await.expect("first event");
        let second = sub.recv().await.expect("second event");
        assert_eq!(first.event.event_type(), "crawler.started");
        assert_eq!(second.event.event_type(), "crawler.completed");
        assert!(second.event.is_terminal());
    }

    #[tokio::test]
    async fn patterns_filter_by_prefix() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(vec!["analyzer.*".to_string()]);

        bus.emit(started("p1"));
        bus.emit(AnalyzerEvent::Started {
            project_id: "p1".to_string(),
            total_pages: 3,
        });

        let received = sub.recv().await.expect("analyzer event");
        assert_eq!(received.event.event_type(), "analyzer.started");
    }

    #[tokio::test]
    async fn exact_pattern_matches_single_type() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(vec!["crawler.completed".to_string()]);

        bus.emit(started("p1"));
        bus.emit(CrawlerEvent::Completed {
            project_id: "p1".to_string(),
            crawled: 0,
            total: 0,
        });

        let received = sub.recv().await.expect("completed event");
        assert_eq!(received.event.event_type(), "crawler.completed");
    }
}
