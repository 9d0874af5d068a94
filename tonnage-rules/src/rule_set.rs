//! Rule set configuration: ordered weight rules, ordered category rules,
//! and factor overrides used to derive calibration variants.
//!
//! Priority is position. The first weight rule whose pattern matches a
//! product decides its weight factor; the category list is evaluated the
//! same way, independently.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};
use crate::pattern::PatternSpec;
use crate::units::MassUnit;

/// Label used when no category rule matches.
pub const DEFAULT_CATEGORY: &str = "other";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightRuleSpec {
    pub id: String,
    pub pattern: PatternSpec,
    /// Mass of one sold unit, in `unit`.
    pub amount: f64,
    #[serde(default)]
    pub unit: MassUnit,
}

impl WeightRuleSpec {
    pub fn new(id: impl Into<String>, pattern: PatternSpec, amount: f64, unit: MassUnit) -> Self {
        Self {
            id: id.into(),
            pattern,
            amount,
            unit,
        }
    }

    /// Weight factor in kilograms per sold unit.
    pub fn factor_kg(&self) -> f64 {
        self.unit.to_kilograms(self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryRuleSpec {
    pub id: String,
    pub pattern: PatternSpec,
    pub label: String,
}

impl CategoryRuleSpec {
    pub fn new(id: impl Into<String>, pattern: PatternSpec, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern,
            label: label.into(),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A versioned, ordered collection of classification rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSetSpec {
    pub id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parent rule set. Rules declared here are evaluated before the parent's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub weight_rules: Vec<WeightRuleSpec>,
    #[serde(default)]
    pub category_rules: Vec<CategoryRuleSpec>,
    #[serde(default = "default_category")]
    pub default_category: String,
}

impl RuleSetSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: default_version(),
            description: None,
            extends: None,
            weight_rules: Vec::new(),
            category_rules: Vec::new(),
            default_category: default_category(),
        }
    }

    pub fn with_weight_rule(mut self, rule: WeightRuleSpec) -> Self {
        self.weight_rules.push(rule);
        self
    }

    pub fn with_category_rule(mut self, rule: CategoryRuleSpec) -> Self {
        self.category_rules.push(rule);
        self
    }

    /// Structural validation. Pattern compilation happens in the classifier.
    pub fn validate(&self) -> RuleResult<()> {
        if self.id.trim().is_empty() {
            return Err(RuleError::EmptyRuleSetId);
        }

        let ids = self
            .weight_rules
            .iter()
            .map(|r| r.id.as_str())
            .chain(self.category_rules.iter().map(|r| r.id.as_str()));
        let mut seen = HashSet::new();
        for (position, id) in ids.enumerate() {
            if id.trim().is_empty() {
                return Err(RuleError::EmptyRuleId {
                    rule_set: self.id.clone(),
                    position,
                });
            }
            if !seen.insert(id) {
                return Err(RuleError::DuplicateRuleId {
                    rule_set: self.id.clone(),
                    rule_id: id.to_string(),
                });
            }
        }

        for rule in &self.weight_rules {
            validate_amount(&rule.id, rule.amount)?;
        }
        Ok(())
    }

    /// Derive a new rule set with the amounts of named weight rules replaced.
    ///
    /// Rule order is preserved. Every override must name an existing weight
    /// rule; an override without a unit keeps the rule's unit.
    pub fn with_overrides(
        &self,
        derived_id: impl Into<String>,
        overrides: &[FactorOverride],
    ) -> RuleResult<RuleSetSpec> {
        let mut derived = self.clone();
        derived.id = derived_id.into();

        for factor in overrides {
            let rule = derived
                .weight_rules
                .iter_mut()
                .find(|r| r.id == factor.rule_id)
                .ok_or_else(|| RuleError::UnknownOverrideTarget {
                    rule_set: self.id.clone(),
                    rule_id: factor.rule_id.clone(),
                })?;
            validate_amount(&factor.rule_id, factor.amount)?;
            rule.amount = factor.amount;
            if let Some(unit) = factor.unit {
                rule.unit = unit;
            }
        }
        Ok(derived)
    }
}

fn validate_amount(rule_id: &str, amount: f64) -> RuleResult<()> {
    if !amount.is_finite() {
        return Err(RuleError::InvalidWeight {
            rule_id: rule_id.to_string(),
            reason: format!("amount {amount} is not finite"),
        });
    }
    if amount < 0.0 {
        return Err(RuleError::InvalidWeight {
            rule_id: rule_id.to_string(),
            reason: format!("amount {amount} is negative"),
        });
    }
    Ok(())
}

/// Replacement amount for one weight rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorOverride {
    pub rule_id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<MassUnit>,
}

impl FactorOverride {
    pub fn new(rule_id: impl Into<String>, amount: f64) -> Self {
        Self {
            rule_id: rule_id.into(),
            amount,
            unit: None,
        }
    }
}
