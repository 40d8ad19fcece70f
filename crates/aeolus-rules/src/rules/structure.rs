//! Structure dimension rules

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use aeolus_intelligence::StructuredRequest;
use aeolus_types::{Dimension, PageCategory, Severity};

use crate::config::ScoringConfigHandle;
use crate::context::RuleContext;
use crate::rule::{Applicability, Evidence, Rule, RuleIssue, RuleResult};
use crate::Result;

/// Single H1 and no skipped heading levels
pub struct HeadingHierarchyRule;

#[async_trait]
impl Rule for HeadingHierarchyRule {
    fn id(&self) -> &'static str {
        "structure.heading-hierarchy"
    }

    fn name(&self) -> &'static str {
        "Heading hierarchy"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Structure
    }

    fn priority(&self) -> u32 {
        100
    }

    fn impact_score(&self) -> u8 {
        3
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let signals = &ctx.signals;
        let mut score = 0;
        let mut evidence = Vec::new();
        let mut issues = Vec::new();

        match signals.h1_count {
            1 => {
                score += 40;
                evidence.push(Evidence::success("headings", "Exactly one H1").with_score(40).with_target(40));
            }
            0 => {
                evidence.push(Evidence::error("headings", "No H1 found"));
                issues.push(RuleIssue::new(
                    Severity::Critical,
                    "Page has no H1",
                    "Add a single H1 stating the page topic",
                ));
            }
            count => {
                score += 20;
                evidence.push(Evidence::warning("headings", format!("{count} H1 elements found")));
                issues.push(RuleIssue::new(
                    Severity::Medium,
                    "Multiple H1 elements compete for the topic",
                    "Keep one H1 and demote the rest",
                ));
            }
        }

        // A child heading may descend at most one level at a time
        let mut skipped = false;
        let mut last_level = 0u8;
        for heading in &signals.headings {
            if last_level > 0 && heading.level > last_level + 1 {
                skipped = true;
            }
            last_level = heading.level;
        }
        if signals.headings.is_empty() {
            // Covered by the H1 issue above
        } else if skipped {
            evidence.push(Evidence::warning("headings", "Heading levels are skipped"));
            issues.push(RuleIssue::new(
                Severity::Low,
                "Heading levels jump more than one step",
                "Nest headings without skipping levels",
            ));
        } else {
            score += 30;
            evidence.push(Evidence::success("headings", "No skipped heading levels"));
        }

        if signals.headings.len() >= 3 {
            score += 30;
            evidence.push(Evidence::success(
                "headings",
                format!("{} headings structure the page", signals.headings.len()),
            ));
        } else {
            evidence.push(Evidence::info("headings", "Few headings on the page"));
        }

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(evidence)
            .with_issues(issues)
            .with_detail("h1_count", serde_json::json!(signals.h1_count)))
    }
}

/// Sentence-length banding with a structured score breakdown
pub struct ReadabilityRule {
    config: Arc<ScoringConfigHandle>,
}

impl ReadabilityRule {
    pub fn new(config: Arc<ScoringConfigHandle>) -> Self {
        Self { config }
    }

    fn band(avg_sentence_words: f64) -> u32 {
        match avg_sentence_words {
            avg if avg <= 0.0 => 0,
            avg if avg <= 15.0 => 100,
            avg if avg <= 20.0 => 85,
            avg if avg <= 25.0 => 70,
            avg if avg <= 30.0 => 50,
            _ => 30,
        }
    }
}

#[async_trait]
impl Rule for ReadabilityRule {
    fn id(&self) -> &'static str {
        "structure.readability"
    }

    fn name(&self) -> &'static str {
        "Readability"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Structure
    }

    fn priority(&self) -> u32 {
        90
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let signals = &ctx.signals;
        let avg = signals.avg_sentence_words;
        let score = Self::band(avg);

        let config = self.config.load();
        let max_avg = config
            .dimension(Dimension::Structure)
            .and_then(|c| c.criterion_f64("max_avg_sentence_words"))
            .unwrap_or(25.0);

        let mut evidence = vec![Evidence::new(
            "readability",
            crate::rule::EvidenceIcon::Score,
            format!(
                "Average sentence length {:.1} words over {} sentences",
                avg, signals.sentence_count
            ),
        )
        .with_score(score)
        .with_target(100)];
        let mut issues = Vec::new();

        if signals.sentence_count == 0 {
            evidence.push(Evidence::error("readability", "No sentences found"));
            issues.push(RuleIssue::new(
                Severity::High,
                "Page has no readable prose",
                "Write the core content as plain paragraphs",
            ));
        } else if avg > max_avg {
            issues.push(RuleIssue::new(
                Severity::Medium,
                format!("Sentences average {avg:.1} words, above {max_avg:.0}"),
                "Split long sentences; answer engines quote short ones",
            ));
        }

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(evidence)
            .with_issues(issues)
            .with_detail(
                "breakdown",
                serde_json::json!({
                    "avg_sentence_words": avg,
                    "sentence_count": signals.sentence_count,
                    "band_score": score,
                }),
            ))
    }
}

/// Whether the page answers its question up front.
///
/// LLM-assisted: asks the model whether the opening paragraph answers the
/// title. When no LLM is configured or the whole provider chain fails, the
/// rule falls back to a deterministic heuristic on the first paragraph
/// (documented here: 20-120 words before the second heading scores full),
/// flagging the fallback in evidence.
pub struct AnswerUpfrontRule;

impl AnswerUpfrontRule {
    fn heuristic(ctx: &RuleContext) -> (u32, Evidence) {
        match &ctx.signals.first_paragraph {
            Some(paragraph) => {
                let words = paragraph.split_whitespace().count();
                if (20..=120).contains(&words) {
                    (
                        100,
                        Evidence::success(
                            "answer",
                            format!("Opening paragraph of {words} words answers up front"),
                        ),
                    )
                } else if words > 0 {
                    (
                        60,
                        Evidence::warning(
                            "answer",
                            format!("Opening paragraph is {words} words; aim for 20-120"),
                        ),
                    )
                } else {
                    (0, Evidence::error("answer", "Opening paragraph is empty"))
                }
            }
            None => (0, Evidence::error("answer", "No opening paragraph found")),
        }
    }
}

#[async_trait]
impl Rule for AnswerUpfrontRule {
    fn id(&self) -> &'static str {
        "structure.answer-upfront"
    }

    fn name(&self) -> &'static str {
        "Answer up front"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Structure
    }

    fn priority(&self) -> u32 {
        80
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        if let Some(llm) = &ctx.llm {
            let title = ctx.page.metadata.title.as_deref().unwrap_or_default();
            let excerpt: String = ctx.signals.main_excerpt.chars().take(600).collect();
            let prompt = format!(
                "Does this page answer the question implied by its title within the \
                 opening paragraph?\nTitle: {title}\nOpening content: {excerpt}\n\
                 Reply as JSON with fields answers_upfront (boolean) and confidence (0-1)."
            );
            let schema = serde_json::json!({
                "type": "object",
                "properties": {
                    "answers_upfront": {"type": "boolean"},
                    "confidence": {"type": "number"}
                },
                "required": ["answers_upfront"]
            });
            let request = StructuredRequest::new("answer-judge", prompt, schema)
                .with_temperature(0.2)
                .with_max_tokens(128);

            match llm.structured_completion(request).await {
                Ok(value) => {
                    if let Some(answers) = value.get("answers_upfront").and_then(|v| v.as_bool()) {
                        let confidence = value
                            .get("confidence")
                            .and_then(|v| v.as_f64())
                            .unwrap_or(0.5);
                        let score = if answers { 100 } else { 30 };
                        let mut issues = Vec::new();
                        if !answers {
                            issues.push(RuleIssue::new(
                                Severity::Medium,
                                "The opening does not answer the page's question",
                                "State the direct answer in the first paragraph",
                            ));
                        }
                        return Ok(RuleResult::new(score, self.default_weight())
                            .with_evidence(vec![Evidence::info(
                                "answer",
                                format!(
                                    "Model judged answers_upfront={answers} (confidence {confidence:.2})"
                                ),
                            )])
                            .with_issues(issues)
                            .with_detail("confidence", serde_json::json!(confidence)));
                    }
                    debug!("Answer-upfront response missing fields, using heuristic");
                }
                Err(error) => {
                    debug!(error = %error, "Answer-upfront LLM chain failed, using heuristic");
                }
            }
        }

        let (score, evidence) = Self::heuristic(ctx);
        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(vec![
                evidence,
                Evidence::warning("answer", "Deterministic fallback used; low confidence"),
            ])
            .with_detail("fallback", serde_json::json!(true)))
    }
}

/// Question-shaped headings for answer extraction
pub struct FaqStructureRule;

#[async_trait]
impl Rule for FaqStructureRule {
    fn id(&self) -> &'static str {
        "structure.faq-structure"
    }

    fn name(&self) -> &'static str {
        "FAQ structure"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Structure
    }

    fn priority(&self) -> u32 {
        70
    }

    fn applicability(&self) -> Applicability {
        Applicability::PageTypes(vec![
            PageCategory::Faq,
            PageCategory::HowToGuide,
            PageCategory::BlogPost,
        ])
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let questions = ctx.signals.question_heading_count;
        let is_faq = ctx.page.page_type == PageCategory::Faq;

        let (score, evidence) = match questions {
            0 => (
                30,
                Evidence::warning("faq", "No question-shaped headings found"),
            ),
            1 | 2 => (
                70,
                Evidence::info("faq", format!("{questions} question headings found")),
            ),
            _ => (
                100,
                Evidence::success("faq", format!("{questions} question headings found")),
            ),
        };

        let mut issues = Vec::new();
        if questions == 0 {
            issues.push(RuleIssue::new(
                if is_faq { Severity::High } else { Severity::Medium },
                "Headings are not phrased as questions",
                "Phrase section headings as the questions readers ask",
            ));
        }
        if is_faq && !ctx.signals.has_schema_type("FAQPage") {
            issues.push(RuleIssue::new(
                Severity::Medium,
                "FAQ page lacks FAQPage structured data",
                "Add FAQPage JSON-LD listing each question and answer",
            ));
        }

        Ok(RuleResult::new(score, self.default_weight())
            .with_evidence(vec![evidence])
            .with_issues(issues))
    }
}

/// Lists and tables make content machine-extractable
pub struct ListTableUsageRule {
    config: Arc<ScoringConfigHandle>,
}

impl ListTableUsageRule {
    pub fn new(config: Arc<ScoringConfigHandle>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Rule for ListTableUsageRule {
    fn id(&self) -> &'static str {
        "structure.list-table-usage"
    }

    fn name(&self) -> &'static str {
        "Lists and tables"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Structure
    }

    fn priority(&self) -> u32 {
        60
    }

    fn impact_score(&self) -> u8 {
        1
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<RuleResult> {
        let config = self.config.load();
        let minimum = config
            .dimension(Dimension::Structure)
            .and_then(|c| c.criterion_u64("min_list_or_table"))
            .unwrap_or(1) as usize;

        let lists = ctx.signals.list_count;
        let tables = ctx.signals.table_count;
        let structured = lists + tables;

        let result = if structured >= minimum.max(1) * 2 {
            RuleResult::new(100, self.default_weight()).with_evidence(vec![Evidence::success(
                "lists",
                format!("{lists} lists and {tables} tables found"),
            )])
        } else if structured >= minimum {
            RuleResult::new(80, self.default_weight()).with_evidence(vec![Evidence::success(
                "lists",
                format!("{lists} lists and {tables} tables found"),
            )])
        } else {
            RuleResult::new(40, self.default_weight())
                .with_evidence(vec![Evidence::warning("lists", "No lists or tables found")])
                .with_issues(vec![RuleIssue::new(
                    Severity::Low,
                    "Content has no list or table structure",
                    "Break enumerable facts into lists or tables",
                )])
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{article_context, context_from_html};
    use aeolus_intelligence::MockLlmProvider;
    use serde_json::json;

    #[tokio::test]
    async fn well_formed_headings_score_full() {
        let result = HeadingHierarchyRule
            .evaluate(&article_context())
            .await
            .unwrap();
        assert_eq!(result.score, 100);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn missing_h1_is_critical() {
        let html = "<html><body><h2>Only a subheading</h2><p>text here.</p></body></html>";
        let ctx = context_from_html(html, PageCategory::BlogPost);
        let result = HeadingHierarchyRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.issues[0].severity, Severity::Critical);
        assert!(result.score < 50);
    }

    #[tokio::test]
    async fn skipped_levels_lose_points() {
        let html = r#"<html><body>
            <h1>Top</h1><h4>Way down</h4>
            <p>text.</p></body></html>"#;
        let ctx = context_from_html(html, PageCategory::BlogPost);
        let result = HeadingHierarchyRule.evaluate(&ctx).await.unwrap();
        assert!(result.issues.iter().any(|i| i.severity == Severity::Low));
    }

    #[test]
    fn readability_bands_follow_sentence_length() {
        assert_eq!(ReadabilityRule::band(12.0), 100);
        assert_eq!(ReadabilityRule::band(18.0), 85);
        assert_eq!(ReadabilityRule::band(23.0), 70);
        assert_eq!(ReadabilityRule::band(28.0), 50);
        assert_eq!(ReadabilityRule::band(40.0), 30);
        assert_eq!(ReadabilityRule::band(0.0), 0);
    }

    #[tokio::test]
    async fn readability_records_breakdown_detail() {
        let rule = ReadabilityRule::new(Arc::new(ScoringConfigHandle::new()));
        let result = rule.evaluate(&article_context()).await.unwrap();
        assert!(result.details.contains_key("breakdown"));
        assert!(result.score >= 70, "short sentences should band high");
    }

    #[tokio::test]
    async fn answer_upfront_uses_llm_verdict() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.push_response(json!({"answers_upfront": true, "confidence": 0.9}));
        let ctx = article_context().with_llm(provider);

        let result = AnswerUpfrontRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.score, 100);
        assert!(result.details.get("fallback").is_none());
    }

    #[tokio::test]
    async fn answer_upfront_falls_back_on_llm_failure() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.push_failure(aeolus_intelligence::IntelligenceError::AllProvidersFailed);
        let ctx = article_context().with_llm(provider);

        let result = AnswerUpfrontRule.evaluate(&ctx).await.unwrap();
        assert_eq!(result.details.get("fallback"), Some(&json!(true)));
        // Heuristic path still produces a usable score
        assert!(result.score > 0);
    }

    #[tokio::test]
    async fn answer_upfront_without_llm_is_deterministic() {
        let first = AnswerUpfrontRule.evaluate(&article_context()).await.unwrap();
        let second = AnswerUpfrontRule.evaluate(&article_context()).await.unwrap();
        assert_eq!(first.score, second.score);
        assert_eq!(first.details.get("fallback"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn faq_structure_rewards_question_headings() {
        let result = FaqStructureRule.evaluate(&article_context()).await.unwrap();
        // Two question headings in the fixture
        assert_eq!(result.score, 70);
    }

    #[tokio::test]
    async fn faq_page_without_schema_gets_issue() {
        let html = r#"<html><body>
            <h1>Widget FAQ</h1>
            <h2>What is a widget?</h2><p>A tool.</p>
            <h2>How much does it cost?</h2><p>Little.</p>
            <h2>Where to buy?</h2><p>Here.</p>
            </body></html>"#;
        let ctx = context_from_html(html, PageCategory::Faq);
        let result = FaqStructureRule.evaluate(&ctx).await.unwrap();
        assert!(result
            .issues
            .iter()
            .any(|i| i.description.contains("FAQPage")));
    }

    #[tokio::test]
    async fn list_usage_scores_structured_content() {
        let rule = ListTableUsageRule::new(Arc::new(ScoringConfigHandle::new()));
        let result = rule.evaluate(&article_context()).await.unwrap();
        assert!(result.score >= 80);

        let bare = context_from_html(
            "<html><body><h1>T</h1><p>prose only.</p></body></html>",
            PageCategory::BlogPost,
        );
        let result = rule.evaluate(&bare).await.unwrap();
        assert_eq!(result.score, 40);
    }
}
