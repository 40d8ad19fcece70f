//! Page categorization
//!
//! Assigns every page one category from the closed taxonomy. Unambiguous
//! URLs resolve on a fast path without touching the model; everything else
//! goes to the LLM with a compact content digest and a constrained schema.
//! Out-of-taxonomy or malformed model output downgrades to `unknown`.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use aeolus_intelligence::{LlmClient, StructuredRequest};
use aeolus_rules::signals::clean_text;
use aeolus_types::{PageCategory, PageMetadata};

/// Confidence below which the URL fast path defers to the model
const FAST_PATH_THRESHOLD: f64 = 0.9;

/// Where a categorization came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    UrlPattern,
    Llm,
    Fallback,
}

/// A category with its confidence and provenance
#[derive(Debug, Clone)]
pub struct Categorization {
    pub category: PageCategory,
    pub confidence: f64,
    pub source: CategorySource,
}

/// Categorizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizerConfig {
    /// Model asked for ambiguous pages
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            model: "page-categorizer".to_string(),
            temperature: 0.1,
            max_tokens: 128,
        }
    }
}

/// Tags pages with a taxonomy category
pub struct PageCategorizer {
    config: CategorizerConfig,
    llm: Option<Arc<dyn LlmClient>>,
}

impl PageCategorizer {
    pub fn new(config: CategorizerConfig) -> Self {
        Self { config, llm: None }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Categorize one page from its URL and content
    pub async fn categorize(
        &self,
        url: &str,
        html: &str,
        metadata: &PageMetadata,
    ) -> Categorization {
        if let Some(fast) = Self::url_fast_path(url) {
            if fast.confidence >= FAST_PATH_THRESHOLD {
                debug!(url, category = %fast.category, "Categorized from URL alone");
                return fast;
            }
        }

        match &self.llm {
            Some(llm) => self.ask_model(llm, url, html, metadata).await,
            None => Categorization {
                category: PageCategory::Unknown,
                confidence: 0.5,
                source: CategorySource::Fallback,
            },
        }
    }

    /// Patterns that settle a category from the URL alone
    fn url_fast_path(url: &str) -> Option<Categorization> {
        let parsed = Url::parse(url).ok()?;
        let path = parsed.path().trim_end_matches('/').to_lowercase();

        if path.is_empty() {
            return Some(Categorization {
                category: PageCategory::Homepage,
                confidence: 1.0,
                source: CategorySource::UrlPattern,
            });
        }
        if path.contains("/404") || path.contains("/error") {
            return Some(Categorization {
                category: PageCategory::Error,
                confidence: 0.95,
                source: CategorySource::UrlPattern,
            });
        }
        if ["/login", "/signin", "/signup"]
            .iter()
            .any(|fragment| path.contains(fragment))
        {
            return Some(Categorization {
                category: PageCategory::Private,
                confidence: 0.95,
                source: CategorySource::UrlPattern,
            });
        }
        None
    }

    async fn ask_model(
        &self,
        llm: &Arc<dyn LlmClient>,
        url: &str,
        html: &str,
        metadata: &PageMetadata,
    ) -> Categorization {
        let digest = content_digest(html, metadata);
        let taxonomy: Vec<&str> = PageCategory::ALL.iter().map(|c| c.as_str()).collect();

        let prompt = format!(
            "Classify this web page into exactly one category from the list:\n{}\n\n\
             URL: {url}\nTitle: {}\nFirst heading: {}\nNavigation: {}\n\
             Content excerpt:\n{}\n\n\
             Reply as JSON with fields category (one of the listed values) and \
             confidence (0-1).",
            taxonomy.join(", "),
            digest.title.as_deref().unwrap_or("(none)"),
            digest.first_h1.as_deref().unwrap_or("(none)"),
            digest.nav_anchors.join(" | "),
            digest.excerpt,
        );
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "category": {"type": "string", "enum": taxonomy},
                "confidence": {"type": "number", "minimum": 0, "maximum": 1}
            },
            "required": ["category"]
        });

        let request = StructuredRequest::new(&self.config.model, prompt, schema)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        match llm.structured_completion(request).await {
            Ok(value) => {
                let category = value
                    .get("category")
                    .and_then(|v| v.as_str())
                    .and_then(|s| PageCategory::from_str(s).ok());
                let confidence = value
                    .get("confidence")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.5)
                    .clamp(0.0, 1.0);

                match category {
                    Some(category) => Categorization {
                        category,
                        confidence,
                        source: CategorySource::Llm,
                    },
                    None => {
                        warn!(url, "Model category outside taxonomy, downgrading to unknown");
                        Categorization {
                            category: PageCategory::Unknown,
                            confidence: 0.5,
                            source: CategorySource::Fallback,
                        }
                    }
                }
            }
            Err(error) => {
                warn!(url, error = %error, "Categorization call failed, downgrading to unknown");
                Categorization {
                    category: PageCategory::Unknown,
                    confidence: 0.5,
                    source: CategorySource::Fallback,
                }
            }
        }
    }
}

/// Compact digest sent to the model
struct ContentDigest {
    title: Option<String>,
    first_h1: Option<String>,
    nav_anchors: Vec<String>,
    excerpt: String,
}

fn content_digest(html: &str, metadata: &PageMetadata) -> ContentDigest {
    let document = Html::parse_document(html);

    let first_h1 = Selector::parse("h1").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    });

    let nav_anchors = Selector::parse("nav a")
        .ok()
        .map(|selector| {
            document
                .select(&selector)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .take(10)
                .collect()
        })
        .unwrap_or_default();

    ContentDigest {
        title: metadata.title.clone(),
        first_h1,
        nav_anchors,
        excerpt: clean_text(html).chars().take(1000).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeolus_intelligence::{IntelligenceError, MockLlmProvider};
    use serde_json::json;

    fn categorizer_with(provider: Arc<MockLlmProvider>) -> PageCategorizer {
        PageCategorizer::new(CategorizerConfig::default()).with_llm(provider)
    }

    #[tokio::test]
    async fn root_path_is_homepage_without_llm() {
        let provider = Arc::new(MockLlmProvider::new());
        let categorizer = categorizer_with(provider.clone());

        let result = categorizer
            .categorize("https://example.com/", "<html></html>", &PageMetadata::default())
            .await;
        assert_eq!(result.category, PageCategory::Homepage);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.source, CategorySource::UrlPattern);
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn error_and_private_paths_fast_path() {
        let categorizer = PageCategorizer::new(CategorizerConfig::default());
        let error = categorizer
            .categorize("https://x.com/404", "<html></html>", &PageMetadata::default())
            .await;
        assert_eq!(error.category, PageCategory::Error);
        assert_eq!(error.confidence, 0.95);

        let private = categorizer
            .categorize("https://x.com/login", "<html></html>", &PageMetadata::default())
            .await;
        assert_eq!(private.category, PageCategory::Private);
    }

    #[tokio::test]
    async fn ambiguous_page_uses_model_with_low_temperature() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.push_response(json!({"category": "blog-post", "confidence": 0.84}));
        let categorizer = categorizer_with(provider.clone());

        let result = categorizer
            .categorize(
                "https://example.com/widgets-guide",
                "<html><body><h1>Guide</h1></body></html>",
                &PageMetadata::default(),
            )
            .await;
        assert_eq!(result.category, PageCategory::BlogPost);
        assert_eq!(result.source, CategorySource::Llm);

        let request = provider.last_request().unwrap();
        assert_eq!(request.temperature, Some(0.1));
        assert!(request.prompt.contains("blog-post"));
    }

    #[tokio::test]
    async fn out_of_taxonomy_category_downgrades_to_unknown() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.push_response(json!({"category": "landing-page", "confidence": 0.99}));
        let categorizer = categorizer_with(provider);

        let result = categorizer
            .categorize(
                "https://example.com/something",
                "<html></html>",
                &PageMetadata::default(),
            )
            .await;
        assert_eq!(result.category, PageCategory::Unknown);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.source, CategorySource::Fallback);
    }

    #[tokio::test]
    async fn llm_failure_downgrades_to_unknown() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.push_failure(IntelligenceError::AllProvidersFailed);
        let categorizer = categorizer_with(provider);

        let result = categorizer
            .categorize(
                "https://example.com/something",
                "<html></html>",
                &PageMetadata::default(),
            )
            .await;
        assert_eq!(result.category, PageCategory::Unknown);
        assert_eq!(result.source, CategorySource::Fallback);
    }

    #[tokio::test]
    async fn no_llm_configured_is_a_fallback() {
        let categorizer = PageCategorizer::new(CategorizerConfig::default());
        let result = categorizer
            .categorize(
                "https://example.com/pricing-maybe",
                "<html></html>",
                &PageMetadata::default(),
            )
            .await;
        assert_eq!(result.category, PageCategory::Unknown);
        assert_eq!(result.confidence, 0.5);
    }
}
