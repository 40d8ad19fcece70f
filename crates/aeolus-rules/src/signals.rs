//! Structural page signals
//!
//! Extracted once per page and shared read-only across every rule
//! evaluation, so no rule re-parses the document.

use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

use aeolus_types::{PageMetadata, ProjectContext};

/// Words that open interrogative headings
const QUESTION_OPENERS: &[&str] = &[
    "what", "how", "why", "when", "where", "who", "which", "can", "does", "is", "are", "should",
];

/// One heading in document order
#[derive(Debug, Clone)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// Pre-extracted structural features of one page
#[derive(Debug, Clone, Default)]
pub struct PageSignals {
    pub word_count: usize,
    pub headings: Vec<Heading>,
    pub h1_count: usize,
    pub first_h1: Option<String>,
    /// JSON-LD `@type` values seen, including inside `@graph`
    pub schema_types: Vec<String>,
    pub list_count: usize,
    pub table_count: usize,
    pub paragraph_count: usize,
    pub sentence_count: usize,
    pub avg_sentence_words: f64,
    /// First ten navigation anchor texts
    pub nav_anchors: Vec<String>,
    /// Up to 1000 characters of main content
    pub main_excerpt: String,
    pub first_paragraph: Option<String>,
    pub internal_link_count: usize,
    pub external_link_count: usize,
    pub brand_mentions: usize,
    pub competitor_mentions: HashMap<String, usize>,
    /// Headings phrased as questions
    pub question_heading_count: usize,
    pub has_viewport_meta: bool,
    /// Visible text length relative to raw HTML length
    pub text_ratio: f64,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Visible text with markup stripped, whitespace collapsed
pub fn clean_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let blocks = selector("p, h1, h2, h3, h4, h5, h6, li, blockquote");

    let mut parts: Vec<String> = Vec::new();
    for element in document.select(&blocks) {
        let text = element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join(" ")
}

fn count_mentions(text_lower: &str, term: &str) -> usize {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return 0;
    }
    text_lower.matches(&term).count()
}

fn collect_schema_types(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(type_value) = map.get("@type") {
                match type_value {
                    serde_json::Value::String(s) => out.push(s.clone()),
                    serde_json::Value::Array(items) => {
                        for item in items {
                            if let Some(s) = item.as_str() {
                                out.push(s.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
            if let Some(graph) = map.get("@graph") {
                collect_schema_types(graph, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_schema_types(item, out);
            }
        }
        _ => {}
    }
}

fn is_question(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.ends_with('?') {
        return true;
    }
    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    QUESTION_OPENERS.contains(&first_word.as_str())
}

impl PageSignals {
    /// Extract every signal from one parsed pass over the document
    pub fn extract(
        html: &str,
        url: &str,
        metadata: &PageMetadata,
        project: &ProjectContext,
    ) -> Self {
        let document = Html::parse_document(html);
        let text = clean_text(html);
        let text_lower = text.to_lowercase();

        // Headings in document order, levels parsed from the element name
        let mut headings = Vec::new();
        for element in document.select(&selector("h1, h2, h3, h4, h5, h6")) {
            let level = element
                .value()
                .name()
                .as_bytes()
                .get(1)
                .and_then(|byte| (*byte as char).to_digit(10))
                .unwrap_or(6) as u8;
            let heading_text = element.text().collect::<String>().trim().to_string();
            if !heading_text.is_empty() {
                headings.push(Heading {
                    level,
                    text: heading_text,
                });
            }
        }
        let h1_count = headings.iter().filter(|h| h.level == 1).count();
        let first_h1 = headings
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.clone());

        let question_heading_count = headings.iter().filter(|h| is_question(&h.text)).count();

        let mut schema_types = Vec::new();
        for value in &metadata.schema {
            collect_schema_types(value, &mut schema_types);
        }

        let paragraphs: Vec<String> = document
            .select(&selector("p"))
            .map(|el| {
                el.text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|t| !t.is_empty())
            .collect();

        let sentences: Vec<&str> = text
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| s.split_whitespace().count() > 1)
            .collect();
        let sentence_count = sentences.len();
        let avg_sentence_words = if sentence_count > 0 {
            sentences
                .iter()
                .map(|s| s.split_whitespace().count())
                .sum::<usize>() as f64
                / sentence_count as f64
        } else {
            0.0
        };

        let nav_anchors: Vec<String> = document
            .select(&selector("nav a"))
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .take(10)
            .collect();

        let (mut internal, mut external) = (0usize, 0usize);
        if let Ok(base) = Url::parse(url) {
            let base_host = base.host_str().map(str::to_lowercase);
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
                let same = resolved.host_str().map(str::to_lowercase) == base_host;
                if same {
                    internal += 1;
                } else {
                    external += 1;
                }
            }
        }

        let brand_mentions = count_mentions(&text_lower, &project.brand_name);
        let competitor_mentions = project
            .competitors
            .iter()
            .map(|competitor| {
                (
                    competitor.clone(),
                    count_mentions(&text_lower, competitor),
                )
            })
            .collect();

        let main_excerpt: String = text.chars().take(1000).collect();

        Self {
            word_count: text.split_whitespace().count(),
            h1_count,
            first_h1,
            question_heading_count,
            schema_types,
            list_count: document.select(&selector("ul, ol")).count(),
            table_count: document.select(&selector("table")).count(),
            paragraph_count: paragraphs.len(),
            sentence_count,
            avg_sentence_words,
            nav_anchors,
            main_excerpt,
            first_paragraph: paragraphs.into_iter().next(),
            internal_link_count: internal,
            external_link_count: external,
            brand_mentions,
            competitor_mentions,
            has_viewport_meta: document
                .select(&selector(r#"meta[name="viewport"]"#))
                .next()
                .is_some(),
            text_ratio: if html.is_empty() {
                0.0
            } else {
                text.len() as f64 / html.len() as f64
            },
            headings,
        }
    }

    /// Whether any extracted schema type matches, case-insensitive
    pub fn has_schema_type(&self, wanted: &str) -> bool {
        self.schema_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<html><head>
        <meta name="viewport" content="width=device-width">
        </head><body>
        <nav><a href="/">Home</a><a href="/pricing">Pricing</a></nav>
        <h1>What is a widget?</h1>
        <p>A widget is a small tool. It helps you work faster.</p>
        <h2>How do widgets work?</h2>
        <p>They spin. Acme widgets spin fastest, faster than Globex.</p>
        <ul><li>one</li><li>two</li></ul>
        <table><tr><td>cell</td></tr></table>
        <a href="/internal">internal</a>
        <a href="https://elsewhere.example/out">external</a>
        </body></html>"#;

    fn project() -> ProjectContext {
        ProjectContext::new("Acme").with_competitors(vec!["Globex".to_string()])
    }

    fn signals() -> PageSignals {
        let metadata = PageMetadata {
            schema: vec![serde_json::json!({
                "@type": "FAQPage",
                "@graph": [{"@type": "Question"}]
            })],
            ..Default::default()
        };
        PageSignals::extract(HTML, "https://example.com/widgets", &metadata, &project())
    }

    #[test]
    fn heading_signals_are_extracted() {
        let signals = signals();
        assert_eq!(signals.h1_count, 1);
        assert_eq!(signals.first_h1.as_deref(), Some("What is a widget?"));
        assert_eq!(signals.question_heading_count, 2);
    }

    #[test]
    fn schema_types_include_graph_members() {
        let signals = signals();
        assert!(signals.has_schema_type("FAQPage"));
        assert!(signals.has_schema_type("question"));
    }

    #[test]
    fn structural_counts_are_present() {
        let signals = signals();
        assert_eq!(signals.list_count, 1);
        assert_eq!(signals.table_count, 1);
        assert_eq!(signals.paragraph_count, 2);
        assert!(signals.word_count > 10);
        assert!(signals.has_viewport_meta);
        assert!(signals.avg_sentence_words > 0.0);
    }

    #[test]
    fn link_counts_split_internal_external() {
        let signals = signals();
        // nav links + body internal link are same-host
        assert_eq!(signals.internal_link_count, 3);
        assert_eq!(signals.external_link_count, 1);
    }

    #[test]
    fn brand_and_competitor_mentions_are_counted() {
        let signals = signals();
        assert_eq!(signals.brand_mentions, 1);
        assert_eq!(signals.competitor_mentions.get("Globex"), Some(&1));
    }

    #[test]
    fn nav_anchors_are_capped_at_ten() {
        let signals = signals();
        assert_eq!(signals.nav_anchors, vec!["Home", "Pricing"]);
    }

    #[test]
    fn empty_page_yields_default_signals() {
        let signals = PageSignals::extract(
            "<html><body></body></html>",
            "https://example.com/",
            &PageMetadata::default(),
            &ProjectContext::default(),
        );
        assert_eq!(signals.word_count, 0);
        assert_eq!(signals.h1_count, 0);
        assert_eq!(signals.sentence_count, 0);
        assert_eq!(signals.avg_sentence_words, 0.0);
    }
}
