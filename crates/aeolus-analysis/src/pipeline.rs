//! Analysis pipeline
//!
//! Reads unprocessed pages for a project, categorizes each one, runs the
//! applicable rules per dimension, aggregates, and persists the resulting
//! `ContentScore`. Per-page failures are logged and counted; only
//! repository failures abort the batch.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use aeolus_events::{AnalyzerEvent, EventBus};
use aeolus_intelligence::LlmClient;
use aeolus_rules::{
    aggregate_dimension, global_score, signals::clean_text, DomainContext, EvaluatedRule,
    Evidence, PageContent, PageSignals, RuleContext, RuleRegistry, RuleResult,
    ScoringConfigHandle, ScoringRulesConfig,
};
use aeolus_types::{
    AnalysisLevel, ContentScore, CrawlRepository, CrawledPage, Dimension, DimensionDetail,
    DimensionScores, ProjectContext, RepositoryError,
};

use crate::categorizer::PageCategorizer;
use crate::{AnalysisError, Result};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPipelineConfig {
    /// Cap on pages pulled per batch; `None` takes everything unprocessed
    pub batch_limit: Option<usize>,
    /// Pages analyzed concurrently; one page's rules stay on one task
    pub concurrency: usize,
}

impl Default for AnalysisPipelineConfig {
    fn default() -> Self {
        Self {
            batch_limit: None,
            concurrency: 2,
        }
    }
}

/// Outcome counts for one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub analyzed: usize,
    pub excluded: usize,
    pub failed: usize,
    /// Fetch-failure placeholders left unprocessed
    pub skipped_placeholders: usize,
}

enum PageOutcome {
    Scored,
    Excluded,
    Failed,
    RepoFailure(RepositoryError),
}

/// Batch analyzer binding crawled pages to the rule engine
pub struct AnalysisPipeline {
    config: AnalysisPipelineConfig,
    repository: Arc<dyn CrawlRepository>,
    registry: Arc<RuleRegistry>,
    scoring: Arc<ScoringConfigHandle>,
    events: Arc<EventBus>,
    categorizer: Arc<PageCategorizer>,
    llm: Option<Arc<dyn LlmClient>>,
}

impl AnalysisPipeline {
    pub fn new(
        config: AnalysisPipelineConfig,
        repository: Arc<dyn CrawlRepository>,
        registry: Arc<RuleRegistry>,
        scoring: Arc<ScoringConfigHandle>,
        events: Arc<EventBus>,
        categorizer: Arc<PageCategorizer>,
    ) -> Self {
        Self {
            config,
            repository,
            registry,
            scoring,
            events,
            categorizer,
            llm: None,
        }
    }

    /// Attach an LLM client for rules that use one
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Analyze every unprocessed page in a project.
    ///
    /// The scoring configuration is loaded once and pinned for the whole
    /// batch, so a concurrent hot swap never mixes versions mid-run.
    pub async fn analyze_project(
        &self,
        project_id: &str,
        project: &ProjectContext,
    ) -> Result<AnalysisSummary> {
        let pages = match self
            .repository
            .find_unprocessed_by_project(project_id, self.config.batch_limit)
            .await
        {
            Ok(pages) => pages,
            Err(error) => {
                self.events.emit(AnalyzerEvent::Failed {
                    project_id: project_id.to_string(),
                    error: error.to_string(),
                });
                return Err(error.into());
            }
        };

        let mut summary = AnalysisSummary::default();

        // Fetch-failure placeholders carry no analyzable content and stay
        // unprocessed for the next crawl to replace.
        let analyzable: Vec<CrawledPage> = pages
            .into_iter()
            .filter(|page| {
                if page.is_fetch_failure() {
                    summary.skipped_placeholders += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        let total = analyzable.len();
        self.events.emit(AnalyzerEvent::Started {
            project_id: project_id.to_string(),
            total_pages: total,
        });
        info!(project_id, total, "Analysis batch started");

        let scoring = self.scoring.load();
        let concurrency = self.config.concurrency.max(1);
        let mut completed = 0usize;

        for chunk in analyzable.chunks(concurrency) {
            for page in chunk {
                self.events.emit(AnalyzerEvent::Progress {
                    project_id: project_id.to_string(),
                    analyzed: completed,
                    total,
                    current_url: page.url.clone(),
                });
            }

            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|page| self.process_page(project_id, project, page, &scoring)),
            )
            .await;

            for outcome in outcomes {
                completed += 1;
                match outcome {
                    PageOutcome::Scored => summary.analyzed += 1,
                    PageOutcome::Excluded => summary.excluded += 1,
                    PageOutcome::Failed => summary.failed += 1,
                    PageOutcome::RepoFailure(error) => {
                        self.events.emit(AnalyzerEvent::Failed {
                            project_id: project_id.to_string(),
                            error: error.to_string(),
                        });
                        return Err(AnalysisError::Repository(error));
                    }
                }
            }
        }

        self.events.emit(AnalyzerEvent::Completed {
            project_id: project_id.to_string(),
        });
        info!(
            project_id,
            analyzed = summary.analyzed,
            excluded = summary.excluded,
            failed = summary.failed,
            "Analysis batch completed"
        );
        Ok(summary)
    }

    async fn process_page(
        &self,
        project_id: &str,
        project: &ProjectContext,
        page: &CrawledPage,
        scoring: &Arc<ScoringRulesConfig>,
    ) -> PageOutcome {
        let categorization = self
            .categorizer
            .categorize(&page.url, &page.html, &page.metadata)
            .await;
        let category = categorization.category;

        if category.analysis_level() == AnalysisLevel::Excluded {
            debug!(url = %page.url, %category, "Page excluded from analysis");
            let record = ContentScore::excluded(
                project_id,
                &page.url,
                page.id,
                category.as_str(),
                &scoring.version,
            );
            if let Err(error) = self.repository.upsert_content_score(record).await {
                return PageOutcome::RepoFailure(error);
            }
            return match self.mark_processed(page).await {
                Ok(()) => PageOutcome::Excluded,
                Err(outcome) => outcome,
            };
        }

        let signals = PageSignals::extract(&page.html, &page.url, &page.metadata, project);
        let content = PageContent {
            url: page.url.clone(),
            html: page.html.clone(),
            clean_content: clean_text(&page.html),
            metadata: page.metadata.clone(),
            page_type: category,
            status_code: page.status_code,
            response_time_ms: page.response_time_ms,
        };

        let mut ctx = RuleContext::new(content, signals, project.clone());
        if let Some(llm) = &self.llm {
            ctx = ctx.with_llm(llm.clone());
        }
        if let Some(host) = Url::parse(&page.url)
            .ok()
            .and_then(|url| url.host_str().map(String::from))
        {
            ctx = ctx.with_domain(DomainContext { domain: host });
        }

        let mut scores = DimensionScores::default();
        let mut details = std::collections::HashMap::new();
        let mut issues = Vec::new();

        for dimension in Dimension::ALL {
            let selected = self.registry.rules_for_dimension(dimension, &ctx);
            let mut evaluated = Vec::with_capacity(selected.len());

            for (rule, weight) in selected {
                let result = match rule.evaluate(&ctx).await {
                    Ok(mut result) => {
                        result.weight = weight;
                        result
                    }
                    // A failing rule contributes zero and the batch moves on
                    Err(error) => {
                        warn!(rule = rule.id(), url = %page.url, error = %error, "Rule evaluation failed");
                        RuleResult::new(0, weight).with_evidence(vec![Evidence::error(
                            "rule",
                            format!("Evaluation failed: {error}"),
                        )])
                    }
                };
                evaluated.push(EvaluatedRule {
                    rule_id: rule.id().to_string(),
                    rule_name: rule.name().to_string(),
                    result,
                });
            }

            let aggregated = aggregate_dimension(dimension, &evaluated);
            scores.set(dimension, aggregated.score);

            let mut evidence = aggregated.evidence;
            if let Some(band) = scoring
                .dimension(dimension)
                .and_then(|rules| rules.band(aggregated.score))
            {
                evidence.push(format!("[rating] {}", band.description));
            }

            details.insert(
                dimension.as_str().to_string(),
                DimensionDetail {
                    score: aggregated.score,
                    contributions: aggregated.contributions,
                    evidence,
                },
            );
            issues.extend(aggregated.issues);
        }

        issues.sort_by_key(|issue| issue.severity);
        let global = global_score(&scores, &scoring.weight_pairs());

        let record = ContentScore {
            id: uuid::Uuid::new_v4(),
            project_id: project_id.to_string(),
            url: page.url.clone(),
            scores,
            global_score: global,
            details,
            issues,
            analyzed_at: chrono::Utc::now(),
            scoring_rules_version: scoring.version.clone(),
            crawled_page_id: page.id,
            excluded: false,
            page_category: category.as_str().to_string(),
        };

        if let Err(error) = self.repository.upsert_content_score(record).await {
            return PageOutcome::RepoFailure(error);
        }
        if let Err(outcome) = self.mark_processed(page).await {
            return outcome;
        }

        self.events.emit(AnalyzerEvent::PageAnalyzed {
            project_id: project_id.to_string(),
            url: page.url.clone(),
            global_score: global,
        });
        PageOutcome::Scored
    }

    /// A page that vanished mid-batch is a per-page failure; any other
    /// storage error aborts the batch.
    async fn mark_processed(&self, page: &CrawledPage) -> std::result::Result<(), PageOutcome> {
        match self.repository.mark_processed(page.id, true).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound(_)) => {
                warn!(url = %page.url, "Page disappeared before it could be marked processed");
                Err(PageOutcome::Failed)
            }
            Err(error) => Err(PageOutcome::RepoFailure(error)),
        }
    }
}
