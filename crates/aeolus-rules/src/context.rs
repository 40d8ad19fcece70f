//! Per-evaluation rule context
//!
//! Built once per (page, analysis run) and handed to every rule by shared
//! reference. Nothing in here is mutated during evaluation.

use std::sync::Arc;

use aeolus_intelligence::LlmClient;
use aeolus_types::{PageCategory, PageMetadata, ProjectContext};

use crate::signals::PageSignals;

/// The page under evaluation
#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: String,
    pub html: String,
    /// Visible text with markup stripped
    pub clean_content: String,
    pub metadata: PageMetadata,
    pub page_type: PageCategory,
    pub status_code: u16,
    pub response_time_ms: u64,
}

/// Site-level context for domain-scoped rules
#[derive(Debug, Clone)]
pub struct DomainContext {
    pub domain: String,
}

/// Everything a rule may consult during one evaluation
pub struct RuleContext {
    pub page: PageContent,
    pub signals: PageSignals,
    pub project: ProjectContext,
    /// Present when LLM-assisted rules may call out
    pub llm: Option<Arc<dyn LlmClient>>,
    /// Present when domain-scoped rules should run
    pub domain: Option<DomainContext>,
}

impl RuleContext {
    pub fn new(page: PageContent, signals: PageSignals, project: ProjectContext) -> Self {
        Self {
            page,
            signals,
            project,
            llm: None,
            domain: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_domain(mut self, domain: DomainContext) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Host of the page URL, when parseable
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.page.url)
            .ok()
            .and_then(|url| url.host_str().map(String::from))
    }
}
