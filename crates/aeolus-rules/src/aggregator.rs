//! Dimension aggregation
//!
//! Pure and stateless. The final dimension score is the weighted average of
//! rule scores; per-rule contributions are recorded for explanation. Only
//! the numeric (score, weight) pairs participate: evidence and detail maps
//! pass through for rendering and are never interpreted here.

use aeolus_types::{Dimension, DimensionScores, RuleContribution, ScoreIssue};

use crate::rule::RuleResult;

/// One rule's identity and result, in priority order
#[derive(Debug, Clone)]
pub struct EvaluatedRule {
    pub rule_id: String,
    pub rule_name: String,
    pub result: RuleResult,
}

/// Aggregated outcome for one dimension
#[derive(Debug, Clone, Default)]
pub struct AggregatedDimension {
    /// Weighted average, rounded to nearest integer; 0 with no rules
    pub score: u32,
    pub contributions: Vec<RuleContribution>,
    /// Rendered evidence lines in priority order
    pub evidence: Vec<String>,
    /// Issues sorted by severity, critical first
    pub issues: Vec<ScoreIssue>,
}

/// Combine rule results for one dimension.
///
/// `finalScore = round(Σ(score·weight) / Σweight)`, falling back to 0 when
/// the weight sum is 0. Contribution per rule is `score·weight / Σweight`
/// rounded to one decimal.
pub fn aggregate_dimension(dimension: Dimension, results: &[EvaluatedRule]) -> AggregatedDimension {
    let total_weight: f64 = results.iter().map(|r| r.result.weight).sum();

    let mut aggregated = AggregatedDimension::default();

    if total_weight > 0.0 {
        let weighted_sum: f64 = results
            .iter()
            .map(|r| r.result.score as f64 * r.result.weight)
            .sum();
        aggregated.score = (weighted_sum / total_weight).round() as u32;
    }

    for evaluated in results {
        let contribution = if total_weight > 0.0 {
            let raw = evaluated.result.score as f64 * evaluated.result.weight / total_weight;
            (raw * 10.0).round() / 10.0
        } else {
            0.0
        };
        aggregated.contributions.push(RuleContribution {
            rule_id: evaluated.rule_id.clone(),
            rule_name: evaluated.rule_name.clone(),
            score: evaluated.result.score,
            weight: evaluated.result.weight,
            contribution,
        });

        aggregated
            .evidence
            .extend(evaluated.result.evidence.iter().map(|e| e.render()));

        aggregated
            .issues
            .extend(evaluated.result.issues.iter().map(|issue| ScoreIssue {
                dimension,
                rule_id: evaluated.rule_id.clone(),
                severity: issue.severity,
                description: issue.description.clone(),
                recommendation: issue.recommendation.clone(),
            }));
    }

    aggregated.issues.sort_by_key(|issue| issue.severity);
    aggregated
}

/// Combine dimension scores into the global score.
///
/// Weights are normalized to sum 1.0; the result is rounded to an integer
/// and bounded to [0, 100] by construction.
pub fn global_score(scores: &DimensionScores, weights: &[(Dimension, f64)]) -> u32 {
    let total: f64 = weights.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return 0;
    }
    let weighted: f64 = weights
        .iter()
        .map(|(dimension, weight)| scores.get(*dimension) as f64 * weight.max(0.0) / total)
        .sum();
    weighted.round() as u32
}
