//! # Aeolus Events
//!
//! Typed progress events for the crawl and analysis stages, and a
//! thread-safe broadcast bus to deliver them. Emission is fire-and-forget:
//! producers never fail or block because a consumer is missing or slow.

pub mod bus;
pub mod events;

pub use bus::{EventBus, EventBusConfig, EventBusStats, EventSubscription};
pub use events::{AeoEvent, AnalyzerEvent, CrawlerEvent, EventEnvelope};
