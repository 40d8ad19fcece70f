//! # Aeolus Rules
//!
//! The scoring rule engine: a registry of independent evaluators with
//! declared applicability, a pure weighted aggregator per dimension, the
//! scoring-rules configuration with atomic hot swap, and the concrete rule
//! set across the four quality dimensions.
//!
//! ## Organization
//!
//! - `rule`: the rule contract, results, evidence, and issues
//! - `context`: the per-evaluation context handed to every rule
//! - `signals`: structural page features extracted once and shared
//! - `registry`: rule registration, filtering, and runtime toggles
//! - `aggregator`: pure weighted aggregation of rule results
//! - `config`: per-dimension thresholds, criteria, and global weights
//! - `rules`: the built-in rule set

pub mod aggregator;
pub mod config;
pub mod context;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod signals;

pub use aggregator::{aggregate_dimension, global_score, AggregatedDimension, EvaluatedRule};
pub use config::{DimensionRules, ScoringConfigHandle, ScoringRulesConfig, ThresholdBand};
pub use context::{DomainContext, PageContent, RuleContext};
pub use registry::RuleRegistry;
pub use rule::{Applicability, Evidence, EvidenceIcon, ExecutionScope, Rule, RuleIssue, RuleResult};
pub use signals::{Heading, PageSignals};

use thiserror::Error;

/// Errors surfaced by the rule engine
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Rule evaluation failed: {0}")]
    Evaluation(String),

    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    #[error("Scoring configuration invalid: {0}")]
    InvalidConfig(String),

    #[error("LLM call failed: {0}")]
    Llm(#[from] aeolus_intelligence::IntelligenceError),
}

pub type Result<T> = std::result::Result<T, RulesError>;
