//! # Aeolus Types
//!
//! Shared types and contracts for the Aeolus AEO crawler and analyzer.
//! This crate holds the persistent data model (crawled pages, content
//! scores), the project context supplied to every analysis run, the page
//! taxonomy, and the repository contract the crawl and analysis engines
//! persist through.
//!
//! ## Organization
//!
//! - `page`: crawled page records and extracted metadata
//! - `score`: content scores, dimensions, issues, and severities
//! - `project`: per-project analysis context
//! - `category`: page taxonomy and analysis levels
//! - `repository`: persistence contract and crawl statistics
//! - `memory`: in-memory repository used by tests and examples

pub mod category;
pub mod memory;
pub mod page;
pub mod project;
pub mod repository;
pub mod score;

pub use category::{AnalysisLevel, PageCategory};
pub use memory::InMemoryRepository;
pub use page::{CrawledPage, PageMetadata};
pub use project::ProjectContext;
pub use repository::{CrawlRepository, CrawledPageUpsert, ProjectCrawlStats};
pub use score::{
    ContentScore, Dimension, DimensionDetail, DimensionScores, RuleContribution, ScoreIssue,
    Severity,
};

use thiserror::Error;

/// Errors surfaced by repository implementations
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflict while upserting: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
