//! The built-in rule set
//!
//! Small, self-contained evaluators grouped by dimension. Construction is
//! explicit: rules that consult scoring criteria take the config handle as
//! a constructor parameter, and the registry receives ready values.

pub mod authority;
pub mod quality;
pub mod structure;
pub mod technical;

use std::sync::Arc;

use crate::config::ScoringConfigHandle;
use crate::registry::RuleRegistry;
use crate::rule::Rule;

pub use authority::{AuthorPresenceRule, BrandMentionRule, CitingSourcesRule, ComparisonContentRule};
pub use quality::{ContentDepthRule, LanguageClarityRule, UpdateFrequencyRule};
pub use structure::{
    AnswerUpfrontRule, FaqStructureRule, HeadingHierarchyRule, ListTableUsageRule, ReadabilityRule,
};
pub use technical::{
    CanonicalTagRule, HttpsSecurityRule, MetaTagsRule, ResponseTimeRule, StatusCodeRule,
    StructuredDataRule,
};

/// Every built-in rule, ready for registration
pub fn default_rules(config: &Arc<ScoringConfigHandle>) -> Vec<Arc<dyn Rule>> {
    vec![
        // Technical
        Arc::new(StatusCodeRule),
        Arc::new(HttpsSecurityRule),
        Arc::new(StructuredDataRule),
        Arc::new(ResponseTimeRule::new(config.clone())),
        Arc::new(MetaTagsRule),
        Arc::new(CanonicalTagRule),
        // Structure
        Arc::new(HeadingHierarchyRule),
        Arc::new(ReadabilityRule::new(config.clone())),
        Arc::new(AnswerUpfrontRule),
        Arc::new(FaqStructureRule),
        Arc::new(ListTableUsageRule::new(config.clone())),
        // Authority
        Arc::new(AuthorPresenceRule),
        Arc::new(CitingSourcesRule::new(config.clone())),
        Arc::new(BrandMentionRule),
        Arc::new(ComparisonContentRule),
        // Quality
        Arc::new(UpdateFrequencyRule),
        Arc::new(ContentDepthRule::new(config.clone())),
        Arc::new(LanguageClarityRule),
    ]
}

/// Register the whole built-in rule set
pub fn register_defaults(registry: &RuleRegistry, config: &Arc<ScoringConfigHandle>) {
    for rule in default_rules(config) {
        registry.register(rule);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::context::{DomainContext, PageContent, RuleContext};
    use crate::signals::{clean_text, PageSignals};
    use aeolus_types::{PageCategory, PageMetadata, ProjectContext};

    pub const ARTICLE_HTML: &str = r#"<html lang="en"><head>
        <title>How to choose a widget</title>
        <meta name="description" content="A practical guide to choosing the right widget for your workload, with comparisons and criteria.">
        </head><body>
        <h1>How to choose a widget?</h1>
        <p>Pick the widget that fits your workload. Acme widgets suit heavy loads. Smaller teams often prefer lighter models.</p>
        <h2>What should you compare?</h2>
        <p>Compare price and speed. Check the warranty too.</p>
        <ul><li>Price</li><li>Speed</li><li>Warranty</li></ul>
        <p>Sources help readers verify claims.
           See <a href="https://standards.example.org/widgets">the widget standard</a>
           and <a href="https://review.example.net/widgets">an independent review</a>.</p>
        <a href="/related">Related guide</a>
        </body></html>"#;

    pub fn project() -> ProjectContext {
        ProjectContext::new("Acme")
            .with_attributes(vec!["reliable".to_string()])
            .with_competitors(vec!["Globex".to_string(), "Initech".to_string()])
    }

    pub fn context_from_html(html: &str, page_type: PageCategory) -> RuleContext {
        context_from_parts(html, page_type, PageMetadata::default(), 200, 150)
    }

    pub fn context_from_parts(
        html: &str,
        page_type: PageCategory,
        metadata: PageMetadata,
        status_code: u16,
        response_time_ms: u64,
    ) -> RuleContext {
        let url = "https://example.com/guides/widgets".to_string();
        let project = project();
        let signals = PageSignals::extract(html, &url, &metadata, &project);
        RuleContext::new(
            PageContent {
                url,
                html: html.to_string(),
                clean_content: clean_text(html),
                metadata,
                page_type,
                status_code,
                response_time_ms,
            },
            signals,
            project,
        )
        .with_domain(DomainContext {
            domain: "example.com".to_string(),
        })
    }

    pub fn article_context() -> RuleContext {
        context_from_html(ARTICLE_HTML, PageCategory::BlogPost)
    }
}
