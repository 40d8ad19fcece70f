//! Authority dimension rules

use async_trait::async_trait;
use std::sync::Arc;

use aeolus_types::{Dimension, PageCategory, Severity};

use crate::config::ScoringConfigHandle;
use crate::context::RuleContext;
use crate::rule::{Applicability, Evidence, Rule, RuleIssue, RuleResult};
use crate::Result;

/// Declared authorship and publication dates
pub struct AuthorPresenceRule;

#[async_trait]
impl Rule for AuthorPresenceRule {
    fn id(&self) -> &'static str {
        "authority.author-presence"
    }

    fn name(&self) -> &'static str {
        "Author presence"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Authority
    }

    fn priority(&self) -> u32 {
        100
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let metadata = &ctx.page.metadata;
        let mut score = 0;
        let mut evidence = Vec::new();
        let mut issues = Vec::new();

        match &metadata.author {
            Some(author) => {
                score += 60;
                evidence.push(Evidence::success("author", format!("Author declared: {author}")));
            }
            None => {
                evidence.push(Evidence::error("author", "No author declared"));
                issues.push(RuleIssue::new(
                    Severity::High,
                    "Content has no attributed author",
                    "Attribute the page to a named author",
                ));
            }
        }

        if metadata.publish_date.is_some() || metadata.modified_date.is_some() {
            score += 40;
            evidence.push(Evidence::success("dates", "Publication dates declared"));
        } else {
            evidence.push(Evidence::warning("dates", "No publication dates declared"));
        }

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(evidence)
            .with_issues(issues))
    }
}

/// Outbound citations to external sources
pub struct CitingSourcesRule {
    config: Arc<ScoringConfigHandle>,
}

impl CitingSourcesRule {
    pub fn new(config: Arc<ScoringConfigHandle>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Rule for CitingSourcesRule {
    fn id(&self) -> &'static str {
        "authority.citing-sources"
    }

    fn name(&self) -> &'static str {
        "Citing sources"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Authority
    }

    fn priority(&self) -> u32 {
        90
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let config = self.config.load();
        let minimum = config
            .dimension(Dimension::Authority)
            .and_then(|c| c.criterion_u64("min_external_citations"))
            .unwrap_or(2) as usize;

        let external = ctx.signals.external_link_count;
        let result = if external >= minimum {
            RuleResult::new(100, self.default_weight()).with_evidence(vec![Evidence::success(
                "citations",
                format!("{external} external references found"),
            )
            .with_score(100)
            .with_target(100)])
        } else if external > 0 {
            RuleResult::new(60, self.default_weight()).with_evidence(vec![Evidence::warning(
                "citations",
                format!("Only {external} external reference found; aim for {minimum}"),
            )])
        } else {
            RuleResult::new(0, self.default_weight())
                .with_evidence(vec![Evidence::error("citations", "No external references")])
                .with_issues(vec![RuleIssue::new(
                    Severity::High,
                    "Claims are not backed by external sources",
                    "Cite authoritative external sources for key claims",
                )])
        };
        Ok(result.with_detail("external_links", serde_json::json!(external)))
    }
}

/// Brand presence in the page copy
pub struct BrandMentionRule;

#[async_trait]
impl Rule for BrandMentionRule {
    fn id(&self) -> &'static str {
        "authority.brand-mention"
    }

    fn name(&self) -> &'static str {
        "Brand mentions"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Authority
    }

    fn priority(&self) -> u32 {
        80
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let mentions = ctx.signals.brand_mentions;
        let brand = &ctx.project.brand_name;

        if brand.trim().is_empty() {
            return Ok(RuleResult::new(100, self.default_weight()).with_evidence(vec![
                Evidence::info("brand", "No brand configured for this project"),
            ]));
        }

        let attributes_present: Vec<&String> = ctx
            .project
            .key_brand_attributes
            .iter()
            .filter(|attribute| {
                ctx.page
                    .clean_content
                    .to_lowercase()
                    .contains(&attribute.to_lowercase())
            })
            .collect();

        let (score, evidence) = match mentions {
            0 => (
                0,
                Evidence::error("brand", format!("'{brand}' is never mentioned")),
            ),
            1 | 2 => (
                70,
                Evidence::warning("brand", format!("'{brand}' mentioned {mentions} times")),
            ),
            _ => (
                100,
                Evidence::success("brand", format!("'{brand}' mentioned {mentions} times")),
            ),
        };

        let mut all_evidence = vec![evidence];
        if !attributes_present.is_empty() {
            all_evidence.push(Evidence::success(
                "brand",
                format!(
                    "Brand attributes present: {}",
                    attributes_present
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }

        let issues = if mentions == 0 {
            vec![RuleIssue::new(
                Severity::Medium,
                "The brand is absent from the page copy",
                "Mention the brand naturally where it answers the reader",
            )]
        } else {
            Vec::new()
        };

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(all_evidence)
            .with_issues(issues)
            .with_detail("mentions", serde_json::json!(mentions)))
    }
}

/// Competitor coverage on comparison pages
pub struct ComparisonContentRule;

#[async_trait]
impl Rule for ComparisonContentRule {
    fn id(&self) -> &'static str {
        "authority.comparison-content"
    }

    fn name(&self) -> &'static str {
        "Comparison coverage"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Authority
    }

    fn priority(&self) -> u32 {
        70
    }

    fn applicability(&self) -> Applicability {
        Applicability::PageTypes(vec![PageCategory::Comparison])
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let competitors = &ctx.project.competitors;
        if competitors.is_empty() {
            return Ok(RuleResult::new(100, self.default_weight()).with_evidence(vec![
                Evidence::info("comparison", "No competitors configured for this project"),
            ]));
        }

        let covered: Vec<&String> = competitors
            .iter()
            .filter(|competitor| {
                ctx.signals
                    .competitor_mentions
                    .get(*competitor)
                    .copied()
                    .unwrap_or(0)
                    > 0
            })
            .collect();

        let fraction = covered.len() as f64 / competitors.len() as f64;
        let score = (fraction * 100.0).round() as u32;

        let mut issues = Vec::new();
        if covered.is_empty() {
            issues.push(RuleIssue::new(
                Severity::Medium,
                "Comparison page names no tracked competitor",
                "Compare against the competitors readers actually weigh",
            ));
        }

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(vec![Evidence::info(
                "comparison",
                format!("{} of {} competitors covered", covered.len(), competitors.len()),
            )])
            .with_issues(issues)
            .with_detail("covered", serde_json::json!(covered.len())))
    }
}
