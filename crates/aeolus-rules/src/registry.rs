//! Rule registration and selection
//!
//! Rules are held per dimension, priority-sorted, with runtime enable and
//! weight overrides. Selection filters by applicability against the page
//! type and, for domain-scoped rules, by the presence of domain context.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use aeolus_types::Dimension;

use crate::context::RuleContext;
use crate::rule::{ExecutionScope, Rule};
use crate::{Result, RulesError};

/// A rule plus its runtime state
#[derive(Clone)]
struct RegisteredRule {
    rule: Arc<dyn Rule>,
    enabled: bool,
    weight: f64,
}

/// Registry of scoring rules indexed by dimension
#[derive(Default)]
pub struct RuleRegistry {
    rules: RwLock<HashMap<Dimension, Vec<RegisteredRule>>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule with its default weight
    pub fn register(&self, rule: Arc<dyn Rule>) {
        let weight = rule.default_weight();
        self.register_with_weight(rule, weight);
    }

    /// Register a rule with an explicit weight override
    pub fn register_with_weight(&self, rule: Arc<dyn Rule>, weight: f64) {
        let dimension = rule.dimension();
        debug!(rule = rule.id(), %dimension, weight, "Registering rule");

        let mut rules = self.rules.write();
        let entry = rules.entry(dimension).or_default();
        entry.push(RegisteredRule {
            rule,
            enabled: true,
            weight,
        });
        // Higher priority first; stable for equal priorities
        entry.sort_by(|a, b| b.rule.priority().cmp(&a.rule.priority()));
    }

    /// Enabled rules applicable to the context, in priority order,
    /// paired with their effective weights
    pub fn rules_for_dimension(
        &self,
        dimension: Dimension,
        ctx: &RuleContext,
    ) -> Vec<(Arc<dyn Rule>, f64)> {
        let domain = ctx.domain.as_ref().map(|d| d.domain.as_str());
        let rules = self.rules.read();
        rules
            .get(&dimension)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.enabled)
                    .filter(|entry| {
                        // Domain-scoped rules need a domain context to run
                        entry.rule.execution_scope() == ExecutionScope::Page
                            || ctx.domain.is_some()
                    })
                    .filter(|entry| {
                        entry
                            .rule
                            .applicability()
                            .applies_to(ctx.page.page_type, domain)
                    })
                    .map(|entry| (entry.rule.clone(), entry.weight))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Toggle a rule at runtime
    pub fn set_enabled(&self, rule_id: &str, enabled: bool) -> Result<()> {
        self.update_entry(rule_id, |entry| entry.enabled = enabled)
    }

    /// Override a rule's aggregation weight at runtime
    pub fn update_weight(&self, rule_id: &str, weight: f64) -> Result<()> {
        self.update_entry(rule_id, |entry| entry.weight = weight)
    }

    /// All registered rule ids, for diagnostics
    pub fn rule_ids(&self) -> Vec<String> {
        let rules = self.rules.read();
        let mut ids: Vec<String> = rules
            .values()
            .flatten()
            .map(|entry| entry.rule.id().to_string())
            .collect();
        ids.sort();
        ids
    }

    fn update_entry(
        &self,
        rule_id: &str,
        mut apply: impl FnMut(&mut RegisteredRule),
    ) -> Result<()> {
        let mut rules = self.rules.write();
        for entries in rules.values_mut() {
            if let Some(entry) = entries.iter_mut().find(|entry| entry.rule.id() == rule_id) {
                apply(entry);
                return Ok(());
            }
        }
        Err(RulesError::UnknownRule(rule_id.to_string()))
    }
}
