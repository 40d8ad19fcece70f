//! Quality dimension rules

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use aeolus_types::{Dimension, Severity};

use crate::config::ScoringConfigHandle;
use crate::context::RuleContext;
use crate::rule::{Evidence, Rule, RuleIssue, RuleResult};
use crate::Result;

/// Content freshness from declared modification dates.
///
/// Bands: ≤90 days → 100, ≤180 → 80, ≤365 → 60, older → 40. Pages that
/// declare no date at all score 0 with a critical issue.
pub struct UpdateFrequencyRule;

impl UpdateFrequencyRule {
    fn band(days: i64) -> u32 {
        match days {
            d if d <= 90 => 100,
            d if d <= 180 => 80,
            d if d <= 365 => 60,
            _ => 40,
        }
    }
}

#[async_trait]
impl Rule for UpdateFrequencyRule {
    fn id(&self) -> &'static str {
        "quality.update-frequency"
    }

    fn name(&self) -> &'static str {
        "Update frequency"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Quality
    }

    fn priority(&self) -> u32 {
        100
    }

    fn impact_score(&self) -> u8 {
        3
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let metadata = &ctx.page.metadata;
        let last_touched = metadata.modified_date.or(metadata.publish_date);

        let result = match last_touched {
            Some(date) => {
                let days = (Utc::now() - date).num_days().max(0);
                let score = Self::band(days);
                let evidence = if score >= 80 {
                    Evidence::success("freshness", format!("Updated {days} days ago"))
                } else {
                    Evidence::warning("freshness", format!("Updated {days} days ago"))
                }
                .with_score(score)
                .with_target(100);

                let mut issues = Vec::new();
                if days > 365 {
                    issues.push(RuleIssue::new(
                        Severity::Medium,
                        format!("Content is {days} days old"),
                        "Review and refresh content at least yearly",
                    ));
                }

                RuleResult::new(score, self.default_weight())
                    .with_evidence(vec![evidence])
                    .with_issues(issues)
                    .with_detail("days_since_update", serde_json::json!(days))
            }
            None => RuleResult::new(0, self.default_weight())
                .with_evidence(vec![Evidence::error(
                    "freshness",
                    "No publish or modification date declared",
                )])
                .with_issues(vec![RuleIssue::new(
                    Severity::Critical,
                    "Freshness cannot be established",
                    "Declare article:published_time and article:modified_time",
                )]),
        };
        Ok(result)
    }
}

/// Word count against the configured depth expectations
pub struct ContentDepthRule {
    config: Arc<ScoringConfigHandle>,
}

impl ContentDepthRule {
    pub fn new(config: Arc<ScoringConfigHandle>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Rule for ContentDepthRule {
    fn id(&self) -> &'static str {
        "quality.content-depth"
    }

    fn name(&self) -> &'static str {
        "Content depth"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Quality
    }

    fn priority(&self) -> u32 {
        90
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let config = self.config.load();
        let criteria = config.dimension(Dimension::Quality);
        let minimum = criteria
            .and_then(|c| c.criterion_u64("min_word_count"))
            .unwrap_or(300) as usize;
        let target = criteria
            .and_then(|c| c.criterion_u64("target_word_count"))
            .unwrap_or(800) as usize;

        let words = ctx.signals.word_count;
        let result = if words >= target {
            RuleResult::new(100, self.default_weight()).with_evidence(vec![Evidence::success(
                "depth",
                format!("{words} words, at or above the {target}-word target"),
            )])
        } else if words >= minimum {
            RuleResult::new(70, self.default_weight()).with_evidence(vec![Evidence::success(
                "depth",
                format!("{words} words, above the {minimum}-word minimum"),
            )])
        } else if words >= minimum / 2 {
            RuleResult::new(40, self.default_weight())
                .with_evidence(vec![Evidence::warning(
                    "depth",
                    format!("{words} words, below the {minimum}-word minimum"),
                )])
                .with_issues(vec![RuleIssue::new(
                    Severity::Medium,
                    format!("Content is thin at {words} words"),
                    "Expand the page to answer the topic completely",
                )])
        } else {
            RuleResult::new(10, self.default_weight())
                .with_evidence(vec![Evidence::error(
                    "depth",
                    format!("Only {words} words of content"),
                )])
                .with_issues(vec![RuleIssue::new(
                    Severity::High,
                    format!("Page has almost no content ({words} words)"),
                    "Write substantive content or merge into a fuller page",
                )])
        };
        Ok(result.with_detail("word_count", serde_json::json!(words)))
    }
}

/// Declared language and visible-text density
pub struct LanguageClarityRule;

#[async_trait]
impl Rule for LanguageClarityRule {
    fn id(&self) -> &'static str {
        "quality.language-clarity"
    }

    fn name(&self) -> &'static str {
        "Language clarity"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Quality
    }

    fn priority(&self) -> u32 {
        60
    }

    fn impact_score(&self) -> u8 {
        1
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let mut score = 0;
        let mut evidence = Vec::new();
        let mut issues = Vec::new();

        match &ctx.page.metadata.lang {
            Some(lang) => {
                score += 50;
                evidence.push(Evidence::success("lang", format!("Language declared: {lang}")));
            }
            None => {
                evidence.push(Evidence::warning("lang", "No language declared on <html>"));
                issues.push(RuleIssue::new(
                    Severity::Low,
                    "Document language is undeclared",
                    "Set the lang attribute on the html element",
                ));
            }
        }

        let ratio = ctx.signals.text_ratio;
        if ratio >= 0.10 {
            score += 50;
            evidence.push(Evidence::success(
                "density",
                format!("Visible text is {:.0}% of the document", ratio * 100.0),
            ));
        } else if ratio >= 0.03 {
            score += 25;
            evidence.push(Evidence::info(
                "density",
                format!("Visible text is {:.0}% of the document", ratio * 100.0),
            ));
        } else {
            evidence.push(Evidence::warning(
                "density",
                "Document is mostly markup with little visible text",
            ));
        }

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(evidence)
            .with_issues(issues))
    }
}
