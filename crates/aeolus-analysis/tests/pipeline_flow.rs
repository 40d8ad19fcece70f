//! Pipeline behavior against the in-memory repository

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use aeolus_analysis::{AnalysisPipeline, AnalysisPipelineConfig, CategorizerConfig, PageCategorizer};
use aeolus_events::{AeoEvent, AnalyzerEvent, EventBus};
use aeolus_intelligence::MockLlmProvider;
use aeolus_rules::{
    rules::register_defaults, Rule, RuleContext, RuleRegistry, RuleResult, ScoringConfigHandle,
};
use aeolus_types::{
    ContentScore, CrawlRepository, CrawledPage, CrawledPageUpsert, Dimension, InMemoryRepository,
    PageMetadata, ProjectContext, RepositoryError, RepositoryResult, Severity,
};

const BLOG_HTML: &str = r#"<html lang="en"><head>
    <title>How to choose a widget</title>
    <meta name="description" content="A practical guide to choosing the right widget for your workload, with comparisons.">
    </head><body>
    <h1>How to choose a widget?</h1>
    <p>Pick the widget that fits your workload. Acme widgets suit heavy loads and small teams alike.</p>
    <h2>What should you compare?</h2>
    <p>Compare price and speed. Check the warranty too.</p>
    <ul><li>Price</li><li>Speed</li></ul>
    <p>See <a href="https://standards.example.org/widgets">the standard</a> and
       <a href="https://review.example.net/widgets">a review</a>.</p>
    </body></html>"#;

fn page_fields(html: &str, status: u16) -> CrawledPageUpsert {
    CrawledPageUpsert {
        crawled_at: Utc::now(),
        status_code: status,
        response_time_ms: 150,
        html: html.to_string(),
        headers: Default::default(),
        metadata: PageMetadata {
            title: Some("How to choose a widget".to_string()),
            description: Some(
                "A practical guide to choosing the right widget for your workload.".to_string(),
            ),
            lang: Some("en".to_string()),
            modified_date: Some(Utc::now() - chrono::Duration::days(10)),
            ..Default::default()
        },
        content_hash: "cafe".to_string(),
        error_message: if status == 0 {
            Some("unreachable".to_string())
        } else {
            None
        },
    }
}

fn project() -> ProjectContext {
    ProjectContext::new("Acme").with_competitors(vec!["Globex".to_string()])
}

fn pipeline_parts(
    repository: Arc<dyn CrawlRepository>,
    llm: Arc<MockLlmProvider>,
) -> (AnalysisPipeline, Arc<EventBus>) {
    let registry = Arc::new(RuleRegistry::new());
    let scoring = Arc::new(ScoringConfigHandle::new());
    register_defaults(&registry, &scoring);
    let events = Arc::new(EventBus::new());
    let categorizer =
        Arc::new(PageCategorizer::new(CategorizerConfig::default()).with_llm(llm.clone()));

    let pipeline = AnalysisPipeline::new(
        AnalysisPipelineConfig::default(),
        repository,
        registry,
        scoring,
        events.clone(),
        categorizer,
    )
    .with_llm(llm);
    (pipeline, events)
}

#[tokio::test]
async fn batch_scores_pages_and_excludes_private_ones() {
    let repository = Arc::new(InMemoryRepository::new());
    repository
        .upsert_crawled_page("p1", "https://example.com/guides/widgets", page_fields(BLOG_HTML, 200))
        .await
        .unwrap();
    repository
        .upsert_crawled_page("p1", "https://example.com/login", page_fields("<html><body>sign in</body></html>", 200))
        .await
        .unwrap();

    let llm = Arc::new(MockLlmProvider::new());
    llm.push_response(json!({"category": "blog-post", "confidence": 0.92}));

    let (pipeline, events) = pipeline_parts(repository.clone(), llm);
    let mut subscription = events.subscribe(vec!["analyzer.*".to_string()]);

    let summary = pipeline.analyze_project("p1", &project()).await.unwrap();
    assert_eq!(summary.analyzed, 1);
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.failed, 0);

    // Scored page: all four dimensions, bounded global score, sorted issues.
    let score = repository
        .score_for_url("p1", "https://example.com/guides/widgets")
        .expect("score persisted");
    assert!(!score.excluded);
    assert_eq!(score.page_category, "blog-post");
    assert_eq!(score.details.len(), 4);
    assert!(score.global_score <= 100);
    assert_eq!(score.scoring_rules_version, "builtin-1");
    for window in score.issues.windows(2) {
        assert!(window[0].severity <= window[1].severity, "issues sorted critical first");
    }

    // Excluded page: distinguished zero record.
    let excluded = repository
        .score_for_url("p1", "https://example.com/login")
        .expect("excluded record persisted");
    assert!(excluded.excluded);
    assert_eq!(excluded.global_score, 0);
    assert_eq!(excluded.page_category, "private");

    // Both pages are processed now.
    assert!(repository
        .find_unprocessed_by_project("p1", None)
        .await
        .unwrap()
        .is_empty());

    // Event stream: one started first, one completed last.
    let first = subscription.recv().await.unwrap();
    assert_eq!(first.event.event_type(), "analyzer.started");
    let mut last_type = first.event.event_type().to_string();
    loop {
        match tokio::time::timeout(std::time::Duration::from_millis(200), subscription.recv())
            .await
        {
            Ok(Some(envelope)) => {
                last_type = envelope.event.event_type().to_string();
                if envelope.event.is_terminal() {
                    break;
                }
            }
            _ => break,
        }
    }
    assert_eq!(last_type, "analyzer.completed");
}

#[tokio::test]
async fn fetch_failure_placeholders_are_skipped() {
    let repository = Arc::new(InMemoryRepository::new());
    repository
        .upsert_crawled_page("p1", "https://example.com/down", page_fields("<html><body></body></html>", 0))
        .await
        .unwrap();

    let llm = Arc::new(MockLlmProvider::new());
    let (pipeline, _events) = pipeline_parts(repository.clone(), llm);

    let summary = pipeline.analyze_project("p1", &project()).await.unwrap();
    assert_eq!(summary.skipped_placeholders, 1);
    assert_eq!(summary.analyzed, 0);

    // The placeholder stays unprocessed for the next crawl to replace.
    assert_eq!(
        repository
            .find_unprocessed_by_project("p1", None)
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(repository.score_for_url("p1", "https://example.com/down").is_none());
}

#[tokio::test]
async fn no_rule_runs_for_excluded_pages() {
    struct CountingRule(Arc<AtomicUsize>);

    #[async_trait]
    impl Rule for CountingRule {
        fn id(&self) -> &'static str {
            "technical.counting"
        }
        fn name(&self) -> &'static str {
            "Counting"
        }
        fn dimension(&self) -> Dimension {
            Dimension::Technical
        }
        async fn evaluate(&self, _ctx: &RuleContext) -> aeolus_rules::Result<RuleResult> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(RuleResult::new(100, 1.0))
        }
    }

    let repository = Arc::new(InMemoryRepository::new());
    repository
        .upsert_crawled_page("p1", "https://example.com/signup", page_fields("<html></html>", 200))
        .await
        .unwrap();

    let invocations = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(RuleRegistry::new());
    registry.register(Arc::new(CountingRule(invocations.clone())));

    let pipeline = AnalysisPipeline::new(
        AnalysisPipelineConfig::default(),
        repository.clone(),
        registry,
        Arc::new(ScoringConfigHandle::new()),
        Arc::new(EventBus::new()),
        Arc::new(PageCategorizer::new(CategorizerConfig::default())),
    );

    let summary = pipeline.analyze_project("p1", &project()).await.unwrap();
    assert_eq!(summary.excluded, 1);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);

    let record = repository
        .score_for_url("p1", "https://example.com/signup")
        .unwrap();
    assert!(record.excluded);
}

#[tokio::test]
async fn repository_failure_aborts_the_batch() {
    struct FailingScores(InMemoryRepository);

    #[async_trait]
    impl CrawlRepository for FailingScores {
        async fn upsert_crawled_page(
            &self,
            project_id: &str,
            url: &str,
            fields: CrawledPageUpsert,
        ) -> RepositoryResult<CrawledPage> {
            self.0.upsert_crawled_page(project_id, url, fields).await
        }

        async fn find_unprocessed_by_project(
            &self,
            project_id: &str,
            limit: Option<usize>,
        ) -> RepositoryResult<Vec<CrawledPage>> {
            self.0.find_unprocessed_by_project(project_id, limit).await
        }

        async fn mark_processed(&self, page_id: Uuid, processed: bool) -> RepositoryResult<()> {
            self.0.mark_processed(page_id, processed).await
        }

        async fn upsert_content_score(
            &self,
            _score: ContentScore,
        ) -> RepositoryResult<ContentScore> {
            Err(RepositoryError::Backend("disk full".to_string()))
        }

        async fn get_project_crawl_stats(
            &self,
            project_id: &str,
        ) -> RepositoryResult<aeolus_types::ProjectCrawlStats> {
            self.0.get_project_crawl_stats(project_id).await
        }
    }

    let repository = Arc::new(FailingScores(InMemoryRepository::new()));
    repository
        .upsert_crawled_page("p1", "https://example.com/guides/widgets", page_fields(BLOG_HTML, 200))
        .await
        .unwrap();

    let llm = Arc::new(MockLlmProvider::new());
    llm.push_response(json!({"category": "blog-post", "confidence": 0.92}));

    let (pipeline, events) = {
        let registry = Arc::new(RuleRegistry::new());
        let scoring = Arc::new(ScoringConfigHandle::new());
        register_defaults(&registry, &scoring);
        let events = Arc::new(EventBus::new());
        let categorizer =
            Arc::new(PageCategorizer::new(CategorizerConfig::default()).with_llm(llm.clone()));
        (
            AnalysisPipeline::new(
                AnalysisPipelineConfig::default(),
                repository.clone(),
                registry,
                scoring,
                events.clone(),
                categorizer,
            )
            .with_llm(llm),
            events,
        )
    };

    let mut subscription = events.subscribe(vec!["analyzer.failed".to_string()]);
    let result = pipeline.analyze_project("p1", &project()).await;
    assert!(result.is_err());

    let failed = subscription.recv().await.expect("failed event");
    match failed.event {
        AeoEvent::Analyzer(AnalyzerEvent::Failed { error, .. }) => {
            assert!(error.contains("disk full"));
        }
        other => panic!("expected analyzer.failed, got {other:?}"),
    }
}

#[tokio::test]
async fn issues_from_failing_pages_carry_severity_order() {
    // A page with no metadata at all produces critical freshness issues and
    // assorted lower-severity ones; the persisted list leads with critical.
    let repository = Arc::new(InMemoryRepository::new());
    let mut fields = page_fields("<html><body><p>bare page with few words.</p></body></html>", 200);
    fields.metadata = PageMetadata::default();
    repository
        .upsert_crawled_page("p1", "https://example.com/bare", fields)
        .await
        .unwrap();

    let llm = Arc::new(MockLlmProvider::new());
    llm.push_response(json!({"category": "blog-post", "confidence": 0.9}));

    let (pipeline, _events) = pipeline_parts(repository.clone(), llm);
    pipeline.analyze_project("p1", &project()).await.unwrap();

    let score = repository
        .score_for_url("p1", "https://example.com/bare")
        .unwrap();
    assert!(!score.issues.is_empty());
    assert_eq!(score.issues[0].severity, Severity::Critical);
}
