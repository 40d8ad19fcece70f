//! Technical dimension rules

use async_trait::async_trait;
use std::sync::Arc;

use aeolus_types::{Dimension, PageCategory, Severity};

use crate::config::ScoringConfigHandle;
use crate::context::RuleContext;
use crate::rule::{Evidence, ExecutionScope, Rule, RuleIssue, RuleResult};
use crate::Result;

/// Scores the HTTP status of the crawl response
pub struct StatusCodeRule;

#[async_trait]
impl Rule for StatusCodeRule {
    fn id(&self) -> &'static str {
        "technical.status-code"
    }

    fn name(&self) -> &'static str {
        "HTTP status"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Technical
    }

    fn priority(&self) -> u32 {
        100
    }

    fn impact_score(&self) -> u8 {
        3
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let status = ctx.page.status_code;
        let (score, evidence, issue) = match status {
            200 => (
                100,
                Evidence::success("status", "HTTP 200 returned").with_score(100).with_target(100),
                None,
            ),
            201..=299 => (
                90,
                Evidence::success("status", format!("HTTP {status} returned")).with_score(90).with_target(100),
                None,
            ),
            300..=399 => (
                70,
                Evidence::warning("status", format!("HTTP {status}: page redirects")),
                Some(RuleIssue::new(
                    Severity::Medium,
                    format!("Page responds with a {status} redirect"),
                    "Serve content directly at the canonical URL",
                )),
            ),
            400..=499 => (
                0,
                Evidence::error("status", format!("HTTP {status}: client error")),
                Some(RuleIssue::new(
                    Severity::Critical,
                    format!("Page returns client error {status}"),
                    "Fix or remove the broken URL",
                )),
            ),
            500..=599 => (
                0,
                Evidence::error("status", format!("HTTP {status}: server error")),
                Some(RuleIssue::new(
                    Severity::Critical,
                    format!("Page returns server error {status}"),
                    "Investigate the server failure",
                )),
            ),
            _ => (
                0,
                Evidence::error("status", "Fetch failed, no HTTP response"),
                Some(RuleIssue::new(
                    Severity::Critical,
                    "Page could not be fetched",
                    "Check DNS, TLS, and network reachability",
                )),
            ),
        };

        let mut result = RuleResult::new(score, self.default_weight())
            .with_evidence(vec![evidence])
            .with_detail("status_code", serde_json::json!(status));
        if let Some(issue) = issue {
            result = result.with_issues(vec![issue]);
        }
        Ok(result)
    }
}

/// Site-level TLS posture; runs at domain scope
pub struct HttpsSecurityRule;

#[async_trait]
impl Rule for HttpsSecurityRule {
    fn id(&self) -> &'static str {
        "technical.https-security"
    }

    fn name(&self) -> &'static str {
        "HTTPS security"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Technical
    }

    fn priority(&self) -> u32 {
        90
    }

    fn execution_scope(&self) -> ExecutionScope {
        ExecutionScope::Domain
    }

    fn impact_score(&self) -> u8 {
        3
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let https = ctx.page.url.starts_with("https://");
        let result = if https {
            RuleResult::new(100, self.default_weight())
                .with_evidence(vec![Evidence::success("https", "Site served over HTTPS")])
        } else {
            RuleResult::new(0, self.default_weight())
                .with_evidence(vec![Evidence::error("https", "Site served over plain HTTP")])
                .with_issues(vec![RuleIssue::new(
                    Severity::Critical,
                    "Content is served without TLS",
                    "Serve the site over HTTPS and redirect HTTP traffic",
                )])
        };
        Ok(result)
    }
}

/// JSON-LD presence and fit for the page type
pub struct StructuredDataRule;

impl StructuredDataRule {
    /// Schema types answer engines expect for a page type
    fn expected_types(page_type: PageCategory) -> &'static [&'static str] {
        match page_type {
            PageCategory::BlogPost | PageCategory::HowToGuide => &["Article", "BlogPosting", "HowTo"],
            PageCategory::Faq => &["FAQPage"],
            PageCategory::ProductDetail | PageCategory::ProductCategory => &["Product"],
            PageCategory::Homepage => &["Organization", "WebSite"],
            _ => &[],
        }
    }
}

#[async_trait]
impl Rule for StructuredDataRule {
    fn id(&self) -> &'static str {
        "technical.structured-data"
    }

    fn name(&self) -> &'static str {
        "Structured data"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Technical
    }

    fn priority(&self) -> u32 {
        85
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let types = &ctx.signals.schema_types;
        if types.is_empty() {
            return Ok(RuleResult::new(0, self.default_weight())
                .with_evidence(vec![Evidence::error("schema", "No JSON-LD blocks found")])
                .with_issues(vec![RuleIssue::new(
                    Severity::High,
                    "Page carries no structured data",
                    "Add JSON-LD markup matching the page content",
                )]));
        }

        let expected = Self::expected_types(ctx.page.page_type);
        let matches_expected = expected
            .iter()
            .any(|wanted| ctx.signals.has_schema_type(wanted));

        let mut score = 60;
        let mut evidence = vec![Evidence::success(
            "schema",
            format!("JSON-LD present: {}", types.join(", ")),
        )];
        let mut issues = Vec::new();

        if expected.is_empty() || matches_expected {
            score += 40;
            if matches_expected {
                evidence.push(Evidence::success(
                    "schema",
                    "Schema type fits the page type",
                ));
            }
        } else {
            evidence.push(Evidence::warning(
                "schema",
                format!("Expected one of: {}", expected.join(", ")),
            ));
            issues.push(RuleIssue::new(
                Severity::Medium,
                "Structured data does not match the page type",
                format!("Add {} markup", expected[0]),
            ));
        }

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(evidence)
            .with_issues(issues)
            .with_detail("schema_types", serde_json::json!(types)))
    }
}

/// Bands the crawl response time against configured criteria
pub struct ResponseTimeRule {
    config: Arc<ScoringConfigHandle>,
}

impl ResponseTimeRule {
    pub fn new(config: Arc<ScoringConfigHandle>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Rule for ResponseTimeRule {
    fn id(&self) -> &'static str {
        "technical.response-time"
    }

    fn name(&self) -> &'static str {
        "Response time"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Technical
    }

    fn priority(&self) -> u32 {
        80
    }

    fn impact_score(&self) -> u8 {
        1
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let config = self.config.load();
        let criteria = config.dimension(Dimension::Technical);
        let fast = criteria
            .and_then(|c| c.criterion_u64("fast_response_ms"))
            .unwrap_or(2000);
        let slow = criteria
            .and_then(|c| c.criterion_u64("slow_response_ms"))
            .unwrap_or(5000);

        let elapsed = ctx.page.response_time_ms;
        let result = if elapsed <= fast {
            RuleResult::new(100, self.default_weight()).with_evidence(vec![Evidence::success(
                "speed",
                format!("Responded in {elapsed}ms"),
            )])
        } else if elapsed <= slow {
            RuleResult::new(60, self.default_weight())
                .with_evidence(vec![Evidence::warning(
                    "speed",
                    format!("Responded in {elapsed}ms, above the {fast}ms target"),
                )])
                .with_issues(vec![RuleIssue::new(
                    Severity::Medium,
                    format!("Response took {elapsed}ms"),
                    "Cache or optimize the slowest resources",
                )])
        } else {
            RuleResult::new(20, self.default_weight())
                .with_evidence(vec![Evidence::error(
                    "speed",
                    format!("Responded in {elapsed}ms, above the {slow}ms limit"),
                )])
                .with_issues(vec![RuleIssue::new(
                    Severity::High,
                    format!("Response took {elapsed}ms"),
                    "Profile the backend and reduce time to first byte",
                )])
        };
        Ok(result.with_detail("response_time_ms", serde_json::json!(elapsed)))
    }
}

/// Title and description presence and length
pub struct MetaTagsRule;

#[async_trait]
impl Rule for MetaTagsRule {
    fn id(&self) -> &'static str {
        "technical.meta-tags"
    }

    fn name(&self) -> &'static str {
        "Meta tags"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Technical
    }

    fn priority(&self) -> u32 {
        70
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let metadata = &ctx.page.metadata;
        let mut score = 0;
        let mut evidence = Vec::new();
        let mut issues = Vec::new();

        match &metadata.title {
            Some(title) => {
                score += 30;
                let length = title.chars().count();
                if (10..=70).contains(&length) {
                    score += 20;
                    evidence.push(Evidence::success("title", format!("Title set ({length} chars)")));
                } else {
                    evidence.push(Evidence::warning(
                        "title",
                        format!("Title length {length} outside 10-70 chars"),
                    ));
                }
            }
            None => {
                evidence.push(Evidence::error("title", "No title found"));
                issues.push(RuleIssue::new(
                    Severity::High,
                    "Page has no title",
                    "Add a descriptive title tag",
                ));
            }
        }

        match &metadata.description {
            Some(description) => {
                score += 30;
                let length = description.chars().count();
                if (50..=160).contains(&length) {
                    score += 20;
                    evidence.push(Evidence::success(
                        "description",
                        format!("Description set ({length} chars)"),
                    ));
                } else {
                    evidence.push(Evidence::warning(
                        "description",
                        format!("Description length {length} outside 50-160 chars"),
                    ));
                }
            }
            None => {
                evidence.push(Evidence::error("description", "No meta description found"));
                issues.push(RuleIssue::new(
                    Severity::High,
                    "Page has no meta description",
                    "Add a meta description summarizing the page",
                ));
            }
        }

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(evidence)
            .with_issues(issues))
    }
}

/// Canonical link presence and self-reference
pub struct CanonicalTagRule;

#[async_trait]
impl Rule for CanonicalTagRule {
    fn id(&self) -> &'static str {
        "technical.canonical-tag"
    }

    fn name(&self) -> &'static str {
        "Canonical tag"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Technical
    }

    fn priority(&self) -> u32 {
        60
    }

    fn impact_score(&self) -> u8 {
        1
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let result = match &ctx.page.metadata.canonical_url {
            Some(canonical) => {
                let self_referencing = canonical.trim_end_matches('/') ==
                    ctx.page.url.trim_end_matches('/');
                if self_referencing {
                    RuleResult::new(100, self.default_weight()).with_evidence(vec![
                        Evidence::success("canonical", "Self-referencing canonical present"),
                    ])
                } else {
                    RuleResult::new(80, self.default_weight()).with_evidence(vec![
                        Evidence::info(
                            "canonical",
                            format!("Canonical points elsewhere: {canonical}"),
                        ),
                    ])
                }
            }
            None => RuleResult::new(40, self.default_weight())
                .with_evidence(vec![Evidence::warning("canonical", "No canonical link found")])
                .with_issues(vec![RuleIssue::new(
                    Severity::Medium,
                    "Page declares no canonical URL",
                    "Add a rel=canonical link to avoid duplicate indexing",
                )]),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{article_context, context_from_parts, ARTICLE_HTML};
    use aeolus_types::PageMetadata;

    #[tokio::test]
    async fn status_code_bands() {
        let cases = [(200u16, 100u32), (204, 90), (301, 70), (404, 0), (500, 0), (0, 0)];
        for (status, expected) in cases {
            let ctx = context_from_parts(
                ARTICLE_HTML,
                PageCategory::BlogPost,
                PageMetadata::default(),
                status,
                100,
            );
            let result = StatusCodeRule.evaluate(&ctx).await.unwrap();
            assert_eq!(result.score, expected, "status {status}");
        }
    }

    #[tokio::test]
    async fn status_failure_raises_critical_issue() {
        let ctx = context_from_parts(
            ARTICLE_HTML,
            PageCategory::BlogPost,
            PageMetadata::default(),
            0,
            0,
        );
        let result = StatusCodeRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn https_rule_flags_plain_http() {
        let mut ctx = article_context();
        ctx.page.url = "http://example.com/guides/widgets".to_string();
        let result = HttpsSecurityRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.issues[0].severity, Severity::Critical);

        let result = HttpsSecurityRule.evaluate(&article_context()).await.unwrap();
        assert_eq!(result.score, 100);
    }

    #[tokio::test]
    async fn structured_data_rewards_matching_type() {
        let metadata = PageMetadata {
            schema: vec![serde_json::json!({"@type": "Article"})],
            ..Default::default()
        };
        let ctx = context_from_parts(ARTICLE_HTML, PageCategory::BlogPost, metadata, 200, 100);
        let result = StructuredDataRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.score, 100);

        let metadata = PageMetadata {
            schema: vec![serde_json::json!({"@type": "Recipe"})],
            ..Default::default()
        };
        let ctx = context_from_parts(ARTICLE_HTML, PageCategory::Faq, metadata, 200, 100);
        let result = StructuredDataRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.score, 60);
        assert!(!result.issues.is_empty());
    }

    #[tokio::test]
    async fn missing_structured_data_is_a_high_issue() {
        let result = StructuredDataRule.evaluate(&article_context()).await.unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.issues[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn response_time_uses_config_bands() {
        let config = Arc::new(ScoringConfigHandle::new());
        let rule = ResponseTimeRule::new(config);

        let fast = context_from_parts(ARTICLE_HTML, PageCategory::BlogPost, PageMetadata::default(), 200, 500);
        assert_eq!(rule.evaluate(&fast).await.unwrap().score, 100);

        let slowish = context_from_parts(ARTICLE_HTML, PageCategory::BlogPost, PageMetadata::default(), 200, 3000);
        assert_eq!(rule.evaluate(&slowish).await.unwrap().score, 60);

        let slow = context_from_parts(ARTICLE_HTML, PageCategory::BlogPost, PageMetadata::default(), 200, 9000);
        let result = rule.evaluate(&slow).await.unwrap();
        assert_eq!(result.score, 20);
        assert_eq!(result.issues[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn meta_tags_score_presence_and_length() {
        let metadata = PageMetadata {
            title: Some("How to choose a widget".to_string()),
            description: Some(
                "A practical guide to choosing the right widget for your workload and team."
                    .to_string(),
            ),
            ..Default::default()
        };
        let ctx = context_from_parts(ARTICLE_HTML, PageCategory::BlogPost, metadata, 200, 100);
        let result = MetaTagsRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.score, 100);

        let ctx = context_from_parts(
            ARTICLE_HTML,
            PageCategory::BlogPost,
            PageMetadata::default(),
            200,
            100,
        );
        let result = MetaTagsRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.issues.len(), 2);
    }

    #[tokio::test]
    async fn canonical_scores_self_reference_highest() {
        let metadata = PageMetadata {
            canonical_url: Some("https://example.com/guides/widgets".to_string()),
            ..Default::default()
        };
        let ctx = context_from_parts(ARTICLE_HTML, PageCategory::BlogPost, metadata, 200, 100);
        assert_eq!(CanonicalTagRule.evaluate(&ctx).await.unwrap().score, 100);

        let metadata = PageMetadata {
            canonical_url: Some("https://example.com/other".to_string()),
            ..Default::default()
        };
        let ctx = context_from_parts(ARTICLE_HTML, PageCategory::BlogPost, metadata, 200, 100);
        assert_eq!(CanonicalTagRule.evaluate(&ctx).await.unwrap().score, 80);

        let result = CanonicalTagRule.evaluate(&article_context()).await.unwrap();
        assert_eq!(result.score, 40);
    }
}
