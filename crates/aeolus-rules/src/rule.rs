//! The rule contract
//!
//! A rule is a small, self-contained evaluator for one quality dimension.
//! It declares what it applies to and produces a score with evidence and
//! issues. Evidence is for rendering only: the aggregator consumes nothing
//! but the numeric score and weight.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use aeolus_types::{Dimension, PageCategory, Severity};

use crate::context::RuleContext;
use crate::Result;

/// Icon attached to an evidence item for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceIcon {
    Success,
    Warning,
    Error,
    Info,
    Score,
}

/// A structured, render-only record attached to a rule result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Short topic tag, e.g. `status`, `headings`
    pub topic: String,
    pub icon: EvidenceIcon,
    /// Human-readable message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

impl Evidence {
    pub fn new(topic: impl Into<String>, icon: EvidenceIcon, message: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            icon,
            message: message.into(),
            score: None,
            target: None,
        }
    }

    pub fn success(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(topic, EvidenceIcon::Success, message)
    }

    pub fn warning(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(topic, EvidenceIcon::Warning, message)
    }

    pub fn error(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(topic, EvidenceIcon::Error, message)
    }

    pub fn info(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(topic, EvidenceIcon::Info, message)
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_target(mut self, target: u32) -> Self {
        self.target = Some(target);
        self
    }

    /// Render for the aggregated evidence list
    pub fn render(&self) -> String {
        let mut out = format!("[{}] {}", self.topic, self.message);
        if let Some(score) = self.score {
            out.push_str(&format!(" ({score}"));
            if let Some(target) = self.target {
                out.push_str(&format!("/{target}"));
            }
            out.push(')');
        }
        out
    }
}

/// A severity-tagged actionable finding from one rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleIssue {
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
}

impl RuleIssue {
    pub fn new(
        severity: Severity,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            description: description.into(),
            recommendation: recommendation.into(),
        }
    }
}

/// Outcome of one rule evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResult {
    /// Score in [0, 100]
    pub score: u32,
    /// Weight used during aggregation
    pub weight: f64,
    pub max_score: u32,
    pub passed: bool,
    pub evidence: Vec<Evidence>,
    /// Opaque per-rule detail map; never interpreted by aggregation
    pub details: serde_json::Map<String, serde_json::Value>,
    pub issues: Vec<RuleIssue>,
}

impl RuleResult {
    pub fn new(score: u32, weight: f64) -> Self {
        let score = score.min(100);
        Self {
            score,
            weight,
            max_score: 100,
            passed: score >= 50,
            evidence: Vec::new(),
            details: serde_json::Map::new(),
            issues: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<Evidence>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_issues(mut self, issues: Vec<RuleIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_passed(mut self, passed: bool) -> Self {
        self.passed = passed;
        self
    }
}

/// Whether a rule evaluates individual pages or the site as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionScope {
    Page,
    Domain,
}

/// Declares what a rule runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Applicability {
    /// Every analyzable page
    All,
    /// Only the listed page types
    PageTypes(Vec<PageCategory>),
    /// Only the listed domains
    Domains(Vec<String>),
}

impl Applicability {
    /// Check the declaration against a concrete evaluation context
    pub fn applies_to(&self, page_type: PageCategory, domain: Option<&str>) -> bool {
        match self {
            Applicability::All => true,
            Applicability::PageTypes(types) => types.contains(&page_type),
            Applicability::Domains(domains) => domain
                .map(|d| domains.iter().any(|allowed| allowed.eq_ignore_ascii_case(d)))
                .unwrap_or(false),
        }
    }
}

/// The single capability every scoring rule implements
#[async_trait]
pub trait Rule: Send + Sync {
    /// Stable identifier, e.g. `technical.status-code`
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    fn dimension(&self) -> Dimension;

    /// Higher priority runs (and renders) first within a dimension
    fn priority(&self) -> u32 {
        50
    }

    /// Default aggregation weight; overridable at registration
    fn default_weight(&self) -> f64 {
        1.0
    }

    fn execution_scope(&self) -> ExecutionScope {
        ExecutionScope::Page
    }

    fn applicability(&self) -> Applicability {
        Applicability::All
    }

    /// Business impact from 1 (minor) to 3 (major)
    fn impact_score(&self) -> u8 {
        2
    }

    /// Evaluate the rule against one context.
    ///
    /// Rules that perform I/O (LLM, HTTP) handle their own timeouts and
    /// fall back deterministically where documented.
    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_renders_with_score_and_target() {
        let evidence = Evidence::success("status", "HTTP 200 returned")
            .with_score(100)
            .with_target(100);
        assert_eq!(evidence.render(), "[status] HTTP 200 returned (100/100)");

        let plain = Evidence::info("lang", "declared as en");
        assert_eq!(plain.render(), "[lang] declared as en");
    }

    #[test]
    fn result_clamps_score_to_bounds() {
        let result = RuleResult::new(250, 1.0);
        assert_eq!(result.score, 100);
        assert!(result.passed);

        let result = RuleResult::new(20, 1.0);
        assert!(!result.passed);
    }

    #[test]
    fn applicability_filters_page_types() {
        let only_faq = Applicability::PageTypes(vec![PageCategory::Faq]);
        assert!(only_faq.applies_to(PageCategory::Faq, None));
        assert!(!only_faq.applies_to(PageCategory::BlogPost, None));
        assert!(Applicability::All.applies_to(PageCategory::BlogPost, None));
    }

    #[test]
    fn applicability_filters_domains() {
        let scoped = Applicability::Domains(vec!["example.com".to_string()]);
        assert!(scoped.applies_to(PageCategory::Homepage, Some("Example.com")));
        assert!(!scoped.applies_to(PageCategory::Homepage, Some("other.com")));
        assert!(!scoped.applies_to(PageCategory::Homepage, None));
    }
}
