//! Page fetching and extraction
//!
//! Fetches one URL with retries, parses the HTML, extracts metadata and
//! same-host outlinks, hashes the body, and persists the record. HTML
//! parsing is synchronous and completes before the next await point, so
//! extraction never holds a parsed document across a suspension.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use aeolus_fetch::{FetchClient, FetchResponse};
use aeolus_types::{CrawlRepository, CrawledPage, CrawledPageUpsert, PageMetadata};

use crate::url_utils::{is_content_url, is_same_host, normalize_url};
use crate::SpiderError;

/// Body stored for pages whose fetch failed outright
const PLACEHOLDER_HTML: &str = "<html><body></body></html>";

/// Regional date formats tried after RFC 3339
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%B %d, %Y", "%d %B %Y"];

/// A persisted page together with its extracted outlinks
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub page: CrawledPage,
    /// Same-host outlinks, normalized and deduplicated
    pub outlinks: Vec<String>,
}

/// Fetches, parses, and persists single pages
#[derive(Clone)]
pub struct PageExtractor {
    client: FetchClient,
    repository: Arc<dyn CrawlRepository>,
}

impl PageExtractor {
    pub fn new(client: FetchClient, repository: Arc<dyn CrawlRepository>) -> Self {
        Self { client, repository }
    }

    /// The user agent the underlying client sends
    pub fn user_agent(&self) -> &str {
        self.client.user_agent()
    }

    /// Fetch `url`, extract its content, and persist the result.
    ///
    /// Any HTTP status is a successful crawl observation. A transport
    /// failure after retries persists a placeholder record and returns the
    /// error so the orchestrator can count it.
    pub async fn fetch_and_extract(
        &self,
        project_id: &str,
        url: &str,
    ) -> Result<ExtractedPage, SpiderError> {
        match self.client.fetch(url).await {
            Ok(response) => {
                let (fields, outlinks) = build_page_record(url, response);
                let page = self
                    .repository
                    .upsert_crawled_page(project_id, url, fields)
                    .await?;
                debug!(project_id, url, status = page.status_code, outlinks = outlinks.len(), "Page extracted");
                Ok(ExtractedPage { page, outlinks })
            }
            Err(error) => {
                warn!(project_id, url, error = %error, "Fetch failed, storing placeholder");
                let fields = CrawledPageUpsert {
                    crawled_at: Utc::now(),
                    status_code: 0,
                    response_time_ms: 0,
                    html: PLACEHOLDER_HTML.to_string(),
                    headers: Default::default(),
                    metadata: PageMetadata::default(),
                    content_hash: content_hash(PLACEHOLDER_HTML),
                    error_message: Some(error.to_string()),
                };
                self.repository
                    .upsert_crawled_page(project_id, url, fields)
                    .await?;
                Err(error.into())
            }
        }
    }
}

/// Turn a completed fetch into upsert fields plus outlinks. Fully synchronous.
fn build_page_record(url: &str, response: FetchResponse) -> (CrawledPageUpsert, Vec<String>) {
    let metadata = extract_metadata(&response.body, url);
    let outlinks = extract_outlinks(&response.body, url);
    let fields = CrawledPageUpsert {
        crawled_at: Utc::now(),
        status_code: response.status,
        response_time_ms: response.response_time_ms,
        content_hash: content_hash(&response.body),
        html: if response.body.is_empty() {
            PLACEHOLDER_HTML.to_string()
        } else {
            response.body
        },
        headers: response.headers,
        metadata,
        error_message: None,
    };
    (fields, outlinks)
}

/// SHA-256 hex digest of a body
pub fn content_hash(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

fn selector(css: &str) -> Selector {
    // All selectors in this module are literals known to parse
    Selector::parse(css).expect("static selector")
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    document
        .select(&selector(css))
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn element_text(document: &Html, css: &str) -> Option<String> {
    document
        .select(&selector(css))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extract document metadata from raw HTML
pub fn extract_metadata(html: &str, _url: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let title = element_text(&document, "title")
        .or_else(|| meta_content(&document, r#"meta[property="og:title"]"#))
        .or_else(|| meta_content(&document, r#"meta[name="twitter:title"]"#));

    let description = meta_content(&document, r#"meta[name="description"]"#)
        .or_else(|| meta_content(&document, r#"meta[property="og:description"]"#))
        .or_else(|| meta_content(&document, r#"meta[name="twitter:description"]"#));

    let author = meta_content(&document, r#"meta[name="author"]"#)
        .or_else(|| meta_content(&document, r#"meta[property="article:author"]"#))
        .or_else(|| element_text(&document, r#"[rel="author"]"#))
        .or_else(|| element_text(&document, ".author-name"))
        .or_else(|| element_text(&document, ".by-author"));

    // Meta tags are consulted before visible elements
    let publish_date = first_date(
        &document,
        &[
            (r#"meta[property="article:published_time"]"#, DateSource::Content),
            (r#"meta[name="date"]"#, DateSource::Content),
            (r#"meta[name="publish-date"]"#, DateSource::Content),
            (r#"time[datetime]"#, DateSource::Datetime),
            (".published-date", DateSource::Text),
            (".post-date", DateSource::Text),
        ],
    );

    let modified_date = first_date(
        &document,
        &[
            (r#"meta[property="article:modified_time"]"#, DateSource::Content),
            (r#"meta[name="last-modified"]"#, DateSource::Content),
            (r#"time[itemprop="dateModified"]"#, DateSource::Datetime),
            (".updated-date", DateSource::Text),
        ],
    );

    let canonical_url = document
        .select(&selector(r#"link[rel="canonical"]"#))
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let lang = document
        .select(&selector("html"))
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let schema = document
        .select(&selector(r#"script[type="application/ld+json"]"#))
        .filter_map(|el| parse_json_ld_block(&el.text().collect::<String>()))
        .collect();

    PageMetadata {
        title,
        description,
        author,
        publish_date,
        modified_date,
        canonical_url,
        lang,
        schema,
    }
}

#[derive(Clone, Copy)]
enum DateSource {
    /// `content` attribute of a meta tag
    Content,
    /// `datetime` attribute
    Datetime,
    /// Element text
    Text,
}

fn first_date(document: &Html, sources: &[(&str, DateSource)]) -> Option<DateTime<Utc>> {
    for (css, source) in sources {
        let raw = match source {
            DateSource::Content => meta_content(document, css),
            DateSource::Datetime => document
                .select(&selector(css))
                .next()
                .and_then(|el| el.value().attr("datetime"))
                .map(String::from),
            DateSource::Text => element_text(document, css),
        };
        if let Some(parsed) = raw.as_deref().and_then(parse_flexible_date) {
            return Some(parsed);
        }
    }
    None
}

/// Parse RFC 3339 first, then a small set of regional formats
pub fn parse_flexible_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed.and_utc());
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Parse one JSON-LD script body, tolerating sloppy markup.
///
/// Trims, strips HTML comment markers, then slices the region between the
/// first opener and the last matching closer before parsing.
pub fn parse_json_ld_block(raw: &str) -> Option<serde_json::Value> {
    let cleaned = raw.trim().replace("<!--", "").replace("-->", "");

    let brace = cleaned.find('{');
    let bracket = cleaned.find('[');
    let (open, close) = match (brace, bracket) {
        (Some(b), Some(k)) if k < b => ('[', ']'),
        (Some(_), _) => ('{', '}'),
        (None, Some(_)) => ('[', ']'),
        (None, None) => return None,
    };

    let start = cleaned.find(open)?;
    let end = cleaned.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&cleaned[start..=end]).ok()
}

/// Extract same-host outlinks, resolved against the page URL and normalized
pub fn extract_outlinks(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut seen = std::collections::HashSet::new();
    let mut outlinks = Vec::new();

    for element in document.select(&selector("a[href]")) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        let normalized = normalize_url(resolved.as_str());
        if !is_same_host(&normalized, base_url) || !is_content_url(&normalized) {
            continue;
        }
        if seen.insert(normalized.clone()) {
            outlinks.push(normalized);
        }
    }

    outlinks
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeolus_fetch::FetchClientConfig;
    use aeolus_types::InMemoryRepository;
    use std::time::Duration;

    const PAGE: &str = r#"<!DOCTYPE html>
        <html lang="en">
        <head>
            <title>  Widget Guide  </title>
            <meta name="description" content="How to pick a widget">
            <meta name="author" content="Jo River">
            <meta property="article:published_time" content="2024-03-01T10:00:00Z">
            <meta property="article:modified_time" content="2024-04-01T10:00:00Z">
            <link rel="canonical" href="https://example.com/widgets">
            <script type="application/ld+json">
                {"@type": "Article", "headline": "Widget Guide"}
            </script>
            <script type="application/ld+json">
                not even close to json
            </script>
        </head>
        <body>
            <a href="/a">A</a>
            <a href="./b?y=2&x=1#frag">B</a>
            <a href="https://other.example/c">External</a>
            <a href="mailto:hi@example.com">Mail</a>
            <a href="/logo.png">Binary</a>
            <a href="/a">A again</a>
        </body>
        </html>"#;

    #[test]
    fn metadata_extraction_covers_head_fields() {
        let metadata = extract_metadata(PAGE, "https://example.com/widgets");
        assert_eq!(metadata.title.as_deref(), Some("Widget Guide"));
        assert_eq!(metadata.description.as_deref(), Some("How to pick a widget"));
        assert_eq!(metadata.author.as_deref(), Some("Jo River"));
        assert_eq!(metadata.canonical_url.as_deref(), Some("https://example.com/widgets"));
        assert_eq!(metadata.lang.as_deref(), Some("en"));
        assert!(metadata.publish_date.is_some());
        assert!(metadata.modified_date.is_some());
        // One JSON-LD block parses, the malformed one is dropped
        assert_eq!(metadata.schema.len(), 1);
        assert_eq!(metadata.schema[0]["@type"], "Article");
    }

    #[test]
    fn title_falls_back_to_og_title() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG Title">
        </head><body></body></html>"#;
        let metadata = extract_metadata(html, "https://example.com/");
        assert_eq!(metadata.title.as_deref(), Some("OG Title"));
    }

    #[test]
    fn outlinks_are_same_host_normalized_and_deduped() {
        let outlinks = extract_outlinks(PAGE, "https://example.com/widgets");
        assert_eq!(
            outlinks,
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b?x=1&y=2".to_string(),
            ]
        );
    }

    #[test]
    fn flexible_dates_parse_in_order() {
        assert!(parse_flexible_date("2024-03-01T10:00:00Z").is_some());
        assert!(parse_flexible_date("2024-03-01").is_some());
        assert!(parse_flexible_date("01/03/2024").is_some());
        assert!(parse_flexible_date("March 1, 2024").is_some());
        assert!(parse_flexible_date("1 March 2024").is_some());
        assert!(parse_flexible_date("yesterday-ish").is_none());
        assert!(parse_flexible_date("").is_none());
    }

    #[test]
    fn json_ld_tolerates_comments_and_padding() {
        let block = r#"
            <!-- emitted by cms -->
            {"@type": "FAQPage"}
            <!-- end -->
        "#;
        let value = parse_json_ld_block(block).unwrap();
        assert_eq!(value["@type"], "FAQPage");

        let array_block = r#"[{"@type": "Product"}, {"@type": "Offer"}]"#;
        let value = parse_json_ld_block(array_block).unwrap();
        assert!(value.is_array());

        assert!(parse_json_ld_block("plain text").is_none());
    }

    #[test]
    fn content_hash_is_stable_hex() {
        let hash = content_hash("hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("hello"));
        assert_ne!(hash, content_hash("hello "));
    }

    #[tokio::test]
    async fn failed_fetch_persists_placeholder() {
        let repository = Arc::new(InMemoryRepository::new());
        let client = FetchClient::new(FetchClientConfig {
            timeout: Duration::from_secs(1),
            retry: aeolus_fetch::RetryConfig {
                max_attempts: 1,
                initial_delay: Duration::from_millis(1),
                backoff_multiplier: 2.0,
            },
            ..Default::default()
        })
        .unwrap();

        let extractor = PageExtractor::new(client, repository.clone());
        let result = extractor
            .fetch_and_extract("p1", "http://127.0.0.1:9/down")
            .await;
        assert!(result.is_err());

        let pages = repository.pages_for_project("p1");
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert_eq!(page.status_code, 0);
        assert!(!page.html.is_empty());
        assert!(page.error_message.is_some());
        assert!(!page.is_processed);
    }
}
