//! Scoring-rules configuration
//!
//! Versioned, JSON-loadable thresholds, per-dimension criteria, and global
//! dimension weights. Validation is strict; an invalid document falls back
//! to the built-in defaults with the error surfaced to the caller. Updates
//! are atomic swaps, so a running analysis batch keeps the config it
//! started with.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use aeolus_types::Dimension;

use crate::{Result, RulesError};

/// One score band over a 0-100 metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub min: u32,
    pub max: u32,
    pub score: u32,
    pub description: String,
}

/// Thresholds and criteria for one dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionRules {
    pub thresholds: Vec<ThresholdBand>,
    /// Dimension-specific scalar criteria consulted by rules
    pub criteria: serde_json::Map<String, serde_json::Value>,
}

impl DimensionRules {
    /// The band a 0-100 value falls into
    pub fn band(&self, value: u32) -> Option<&ThresholdBand> {
        self.thresholds
            .iter()
            .find(|band| value >= band.min && value <= band.max)
    }

    /// Numeric criterion, if present
    pub fn criterion_u64(&self, key: &str) -> Option<u64> {
        self.criteria.get(key).and_then(|v| v.as_u64())
    }

    pub fn criterion_f64(&self, key: &str) -> Option<f64> {
        self.criteria.get(key).and_then(|v| v.as_f64())
    }
}

/// Criteria keys each dimension must define, with numeric values
const REQUIRED_CRITERIA: &[(Dimension, &[&str])] = &[
    (Dimension::Technical, &["fast_response_ms", "slow_response_ms"]),
    (
        Dimension::Structure,
        &["max_avg_sentence_words", "min_list_or_table"],
    ),
    (Dimension::Authority, &["min_external_citations"]),
    (Dimension::Quality, &["min_word_count", "target_word_count"]),
];

/// The complete scoring configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRulesConfig {
    pub version: String,
    /// Global dimension weights, normalized during aggregation
    pub weights: HashMap<Dimension, f64>,
    pub dimensions: HashMap<Dimension, DimensionRules>,
}

impl Default for ScoringRulesConfig {
    fn default() -> Self {
        let default_bands = vec![
            ThresholdBand {
                min: 0,
                max: 39,
                score: 25,
                description: "Needs work".to_string(),
            },
            ThresholdBand {
                min: 40,
                max: 69,
                score: 55,
                description: "Fair".to_string(),
            },
            ThresholdBand {
                min: 70,
                max: 89,
                score: 80,
                description: "Good".to_string(),
            },
            ThresholdBand {
                min: 90,
                max: 100,
                score: 95,
                description: "Excellent".to_string(),
            },
        ];

        let criteria = |pairs: &[(&str, u64)]| {
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), serde_json::json!(value)))
                .collect::<serde_json::Map<_, _>>()
        };

        let mut dimensions = HashMap::new();
        dimensions.insert(
            Dimension::Technical,
            DimensionRules {
                thresholds: default_bands.clone(),
                criteria: criteria(&[("fast_response_ms", 2000), ("slow_response_ms", 5000)]),
            },
        );
        dimensions.insert(
            Dimension::Structure,
            DimensionRules {
                thresholds: default_bands.clone(),
                criteria: criteria(&[("max_avg_sentence_words", 25), ("min_list_or_table", 1)]),
            },
        );
        dimensions.insert(
            Dimension::Authority,
            DimensionRules {
                thresholds: default_bands.clone(),
                criteria: criteria(&[("min_external_citations", 2)]),
            },
        );
        dimensions.insert(
            Dimension::Quality,
            DimensionRules {
                thresholds: default_bands,
                criteria: criteria(&[("min_word_count", 300), ("target_word_count", 800)]),
            },
        );

        let weights = HashMap::from([
            (Dimension::Technical, 1.5),
            (Dimension::Structure, 2.0),
            (Dimension::Authority, 1.0),
            (Dimension::Quality, 0.5),
        ]);

        Self {
            version: "builtin-1".to_string(),
            weights,
            dimensions,
        }
    }
}

impl ScoringRulesConfig {
    /// Parse and validate a JSON document
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let config: ScoringRulesConfig = serde_json::from_value(value)
            .map_err(|e| RulesError::InvalidConfig(format!("parse failure: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Global weights as ordered pairs for aggregation
    pub fn weight_pairs(&self) -> Vec<(Dimension, f64)> {
        Dimension::ALL
            .iter()
            .map(|dimension| (*dimension, self.weights.get(dimension).copied().unwrap_or(0.0)))
            .collect()
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionRules> {
        self.dimensions.get(&dimension)
    }

    /// Check threshold coverage, dimension presence, and criteria types
    pub fn validate(&self) -> Result<()> {
        for dimension in Dimension::ALL {
            if !self.weights.contains_key(&dimension) {
                return Err(RulesError::InvalidConfig(format!(
                    "missing weight for dimension '{dimension}'"
                )));
            }
            let Some(rules) = self.dimensions.get(&dimension) else {
                return Err(RulesError::InvalidConfig(format!(
                    "missing dimension '{dimension}'"
                )));
            };
            validate_thresholds(dimension, &rules.thresholds)?;
        }

        for (dimension, keys) in REQUIRED_CRITERIA {
            let rules = self
                .dimensions
                .get(dimension)
                .expect("presence checked above");
            for key in *keys {
                match rules.criteria.get(*key) {
                    Some(value) if value.is_number() => {}
                    Some(_) => {
                        return Err(RulesError::InvalidConfig(format!(
                            "criterion '{key}' for '{dimension}' must be numeric"
                        )))
                    }
                    None => {
                        return Err(RulesError::InvalidConfig(format!(
                            "missing criterion '{key}' for '{dimension}'"
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_thresholds(dimension: Dimension, thresholds: &[ThresholdBand]) -> Result<()> {
    if thresholds.is_empty() {
        return Err(RulesError::InvalidConfig(format!(
            "no thresholds for '{dimension}'"
        )));
    }

    let mut sorted: Vec<&ThresholdBand> = thresholds.iter().collect();
    sorted.sort_by_key(|band| band.min);

    if sorted[0].min != 0 {
        return Err(RulesError::InvalidConfig(format!(
            "thresholds for '{dimension}' must start at 0"
        )));
    }
    if sorted[sorted.len() - 1].max != 100 {
        return Err(RulesError::InvalidConfig(format!(
            "thresholds for '{dimension}' must end at 100"
        )));
    }

    for window in sorted.windows(2) {
        let (prev, next) = (window[0], window[1]);
        if prev.max >= next.min {
            return Err(RulesError::InvalidConfig(format!(
                "thresholds for '{dimension}' overlap at {}",
                next.min
            )));
        }
        if next.min != prev.max + 1 {
            return Err(RulesError::InvalidConfig(format!(
                "thresholds for '{dimension}' leave a gap before {}",
                next.min
            )));
        }
    }

    for band in sorted {
        if band.min > band.max || band.score > 100 {
            return Err(RulesError::InvalidConfig(format!(
                "invalid band [{}, {}] for '{dimension}'",
                band.min, band.max
            )));
        }
    }
    Ok(())
}

/// Hot-swappable handle to the active scoring configuration
pub struct ScoringConfigHandle {
    inner: ArcSwap<ScoringRulesConfig>,
}

impl ScoringConfigHandle {
    /// Start with the built-in defaults
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(ScoringRulesConfig::default()),
        }
    }

    /// Load from JSON; an invalid document activates the defaults and the
    /// error is returned for surfacing.
    pub fn from_json(value: serde_json::Value) -> (Self, Result<()>) {
        match ScoringRulesConfig::from_json(value) {
            Ok(config) => (
                Self {
                    inner: ArcSwap::from_pointee(config),
                },
                Ok(()),
            ),
            Err(error) => {
                warn!(error = %error, "Scoring config invalid, using built-in defaults");
                (Self::new(), Err(error))
            }
        }
    }

    /// The active configuration; callers keep the Arc for a whole batch
    pub fn load(&self) -> Arc<ScoringRulesConfig> {
        self.inner.load_full()
    }

    /// Atomically replace the active configuration.
    ///
    /// An invalid document activates the defaults and surfaces the error.
    pub fn update_rules(&self, value: serde_json::Value) -> Result<()> {
        match ScoringRulesConfig::from_json(value) {
            Ok(config) => {
                info!(version = %config.version, "Scoring config updated");
                self.inner.store(Arc::new(config));
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "Scoring config update invalid, reverting to defaults");
                self.inner.store(Arc::new(ScoringRulesConfig::default()));
                Err(error)
            }
        }
    }
}

impl Default for ScoringConfigHandle {
    fn default() -> Self {
        Self::new()
    }
}
