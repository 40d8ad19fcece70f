//! # Aeolus Analysis
//!
//! Binds the crawl output to the rule engine: each unprocessed page is
//! categorized, routed to the applicable rules per dimension, aggregated,
//! and persisted as a `ContentScore` with progress events along the way.

pub mod categorizer;
pub mod pipeline;

pub use categorizer::{Categorization, CategorizerConfig, CategorySource, PageCategorizer};
pub use pipeline::{AnalysisPipeline, AnalysisPipelineConfig, AnalysisSummary};

use thiserror::Error;

/// Errors surfaced by the analysis pipeline
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Repository error: {0}")]
    Repository(#[from] aeolus_types::RepositoryError),

    #[error("Rule engine error: {0}")]
    Rules(#[from] aeolus_rules::RulesError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
