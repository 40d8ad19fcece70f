//! Page taxonomy and analysis levels
//!
//! Every crawled page is tagged with exactly one category from a closed
//! taxonomy. Each category maps deterministically to an analysis level that
//! controls whether the rule pipeline runs on it at all.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed page taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageCategory {
    Homepage,
    ProductCategory,
    ProductDetail,
    BlogPost,
    HowToGuide,
    Faq,
    CaseStudy,
    Comparison,
    Pricing,
    About,
    Contact,
    Documentation,
    Legal,
    Error,
    Private,
    Unknown,
}

/// How much of the analysis pipeline runs for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisLevel {
    /// All applicable rules run
    Full,
    /// All applicable rules run; scores are advisory for these pages
    Partial,
    /// Only technical rules are meaningful
    Limited,
    /// No rules run; a distinguished excluded record is persisted
    Excluded,
}

impl PageCategory {
    /// Every category in the taxonomy
    pub const ALL: [PageCategory; 16] = [
        PageCategory::Homepage,
        PageCategory::ProductCategory,
        PageCategory::ProductDetail,
        PageCategory::BlogPost,
        PageCategory::HowToGuide,
        PageCategory::Faq,
        PageCategory::CaseStudy,
        PageCategory::Comparison,
        PageCategory::Pricing,
        PageCategory::About,
        PageCategory::Contact,
        PageCategory::Documentation,
        PageCategory::Legal,
        PageCategory::Error,
        PageCategory::Private,
        PageCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageCategory::Homepage => "homepage",
            PageCategory::ProductCategory => "product-category",
            PageCategory::ProductDetail => "product-detail",
            PageCategory::BlogPost => "blog-post",
            PageCategory::HowToGuide => "how-to-guide",
            PageCategory::Faq => "faq",
            PageCategory::CaseStudy => "case-study",
            PageCategory::Comparison => "comparison",
            PageCategory::Pricing => "pricing",
            PageCategory::About => "about",
            PageCategory::Contact => "contact",
            PageCategory::Documentation => "documentation",
            PageCategory::Legal => "legal",
            PageCategory::Error => "error",
            PageCategory::Private => "private",
            PageCategory::Unknown => "unknown",
        }
    }

    /// Deterministic category-to-level mapping
    pub fn analysis_level(&self) -> AnalysisLevel {
        match self {
            PageCategory::Homepage
            | PageCategory::ProductDetail
            | PageCategory::BlogPost
            | PageCategory::HowToGuide
            | PageCategory::Faq
            | PageCategory::CaseStudy
            | PageCategory::Comparison
            | PageCategory::Documentation => AnalysisLevel::Full,
            PageCategory::ProductCategory
            | PageCategory::Pricing
            | PageCategory::About
            | PageCategory::Unknown => AnalysisLevel::Partial,
            PageCategory::Contact => AnalysisLevel::Limited,
            PageCategory::Legal | PageCategory::Error | PageCategory::Private => {
                AnalysisLevel::Excluded
            }
        }
    }
}

impl fmt::Display for PageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageCategory::ALL
            .iter()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .copied()
            .ok_or(())
    }
}
