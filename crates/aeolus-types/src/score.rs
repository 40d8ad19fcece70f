//! Content scores, quality dimensions, issues, and severities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// One of the four orthogonal quality axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Technical,
    Structure,
    Authority,
    Quality,
}

impl Dimension {
    /// All dimensions, in the order they are reported
    pub const ALL: [Dimension; 4] = [
        Dimension::Technical,
        Dimension::Structure,
        Dimension::Authority,
        Dimension::Quality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Technical => "technical",
            Dimension::Structure => "structure",
            Dimension::Authority => "authority",
            Dimension::Quality => "quality",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an actionable issue, ordered critical first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        f.write_str(s)
    }
}

/// An actionable finding surfaced by a rule, tagged with its origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreIssue {
    pub dimension: Dimension,
    pub rule_id: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
}

/// Contribution of a single rule to a dimension's aggregated score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleContribution {
    pub rule_id: String,
    pub rule_name: String,
    /// Raw rule score in [0, 100]
    pub score: u32,
    /// Weight used during aggregation
    pub weight: f64,
    /// `score * weight / total_weight`, rounded to one decimal
    pub contribution: f64,
}

/// Explanatory aggregation detail for one dimension
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionDetail {
    /// Final weighted score in [0, 100]
    pub score: u32,
    /// Per-rule contributions in priority order
    pub contributions: Vec<RuleContribution>,
    /// Rendered evidence lines, concatenated in priority order
    pub evidence: Vec<String>,
}

/// Scores for the four quality dimensions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    pub technical: u32,
    pub structure: u32,
    pub authority: u32,
    pub quality: u32,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> u32 {
        match dimension {
            Dimension::Technical => self.technical,
            Dimension::Structure => self.structure,
            Dimension::Authority => self.authority,
            Dimension::Quality => self.quality,
        }
    }

    pub fn set(&mut self, dimension: Dimension, score: u32) {
        match dimension {
            Dimension::Technical => self.technical = score,
            Dimension::Structure => self.structure = score,
            Dimension::Authority => self.authority = score,
            Dimension::Quality => self.quality = score,
        }
    }
}

/// The persisted analysis outcome for one page, recomputed on reanalysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentScore {
    pub id: Uuid,
    pub project_id: String,
    pub url: String,
    pub scores: DimensionScores,
    /// Weighted combination of dimension scores, in [0, 100]
    pub global_score: u32,
    /// Per-dimension aggregation detail keyed by dimension name
    pub details: HashMap<String, DimensionDetail>,
    /// Issues sorted by severity, critical first
    pub issues: Vec<ScoreIssue>,
    pub analyzed_at: DateTime<Utc>,
    pub scoring_rules_version: String,
    pub crawled_page_id: Uuid,
    /// Set when the page's category excluded it from analysis
    pub excluded: bool,
    /// Category assigned by the categorizer
    pub page_category: String,
}

impl ContentScore {
    /// Distinguished zero-valued record for a page excluded from analysis
    pub fn excluded(
        project_id: impl Into<String>,
        url: impl Into<String>,
        crawled_page_id: Uuid,
        category: impl Into<String>,
        rules_version: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            url: url.into(),
            scores: DimensionScores::default(),
            global_score: 0,
            details: HashMap::new(),
            issues: Vec::new(),
            analyzed_at: Utc::now(),
            scoring_rules_version: rules_version.into(),
            crawled_page_id,
            excluded: true,
            page_category: category.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_first() {
        let mut severities = vec![
            Severity::Low,
            Severity::Critical,
            Severity::Medium,
            Severity::High,
        ];
        severities.sort();
        assert_eq!(
            severities,
            vec![
                Severity::Critical,
                Severity::High,
                Severity::Medium,
                Severity::Low
            ]
        );
    }

    #[test]
    fn excluded_record_is_zero_valued() {
        let score = ContentScore::excluded("p1", "https://x.com/legal", Uuid::new_v4(), "legal", "v1");
        assert!(score.excluded);
        assert_eq!(score.global_score, 0);
        assert_eq!(score.scores.technical, 0);
        assert!(score.issues.is_empty());
        assert_eq!(score.page_category, "legal");
    }

    #[test]
    fn dimension_scores_round_trip() {
        let mut scores = DimensionScores::default();
        for (i, dim) in Dimension::ALL.iter().enumerate() {
            scores.set(*dim, i as u32 * 10);
        }
        assert_eq!(scores.get(Dimension::Technical), 0);
        assert_eq!(scores.get(Dimension::Structure), 10);
        assert_eq!(scores.get(Dimension::Authority), 20);
        assert_eq!(scores.get(Dimension::Quality), 30);
    }
}
