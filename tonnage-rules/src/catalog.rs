//! Rule catalog: named, versioned rule sets with single inheritance.
//!
//! A catalog is loaded from TOML:
//!
//! ```toml
//! active = "sugar-v2"
//!
//! [[rule_sets]]
//! id = "sugar-v1"
//!
//! [[rule_sets.weight_rules]]
//! id = "sack-25"
//! pattern = { name_contains = ["25 KG", "SACO 25"] }
//! amount = 25.0
//!
//! [[rule_sets]]
//! id = "sugar-v2"
//! extends = "sugar-v1"
//! ```
//!
//! Resolving a rule set flattens its `extends` chain: the child's rules come
//! first, then the parent's (minus any the child redefines by id).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::error::{RuleError, RuleResult};
use crate::rule_set::RuleSetSpec;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleCatalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<String>,
    #[serde(default)]
    rule_sets: Vec<RuleSetSpec>,
}

impl RuleCatalog {
    /// Build a catalog and check it: unique ids, known parents, no cycles,
    /// and a known active id.
    pub fn new(rule_sets: Vec<RuleSetSpec>, active: Option<String>) -> RuleResult<Self> {
        let catalog = Self { active, rule_sets };
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_toml_str(text: &str) -> RuleResult<Self> {
        let catalog: RuleCatalog = toml::from_str(text)?;
        catalog.check()?;
        Ok(catalog)
    }

    fn check(&self) -> RuleResult<()> {
        let mut ids = HashSet::new();
        for spec in &self.rule_sets {
            if spec.id.trim().is_empty() {
                return Err(RuleError::EmptyRuleSetId);
            }
            if !ids.insert(spec.id.as_str()) {
                return Err(RuleError::DuplicateRuleSet(spec.id.clone()));
            }
        }
        for spec in &self.rule_sets {
            self.resolve(&spec.id)?.validate()?;
        }
        if let Some(active) = &self.active {
            if !ids.contains(active.as_str()) {
                return Err(RuleError::UnknownRuleSet(active.clone()));
            }
        }
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rule_sets.iter().map(|s| s.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.rule_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_sets.is_empty()
    }

    /// The rule set used for production aggregation.
    ///
    /// Falls back to the only rule set when the catalog has exactly one and
    /// names none.
    pub fn active_id(&self) -> Option<&str> {
        match (&self.active, self.rule_sets.as_slice()) {
            (Some(id), _) => Some(id.as_str()),
            (None, [only]) => Some(only.id.as_str()),
            _ => None,
        }
    }

    pub fn get(&self, id: &str) -> Option<&RuleSetSpec> {
        self.rule_sets.iter().find(|s| s.id == id)
    }

    /// Flatten the `extends` chain of `id` into one ordered rule set.
    pub fn resolve(&self, id: &str) -> RuleResult<RuleSetSpec> {
        let mut chain: Vec<&RuleSetSpec> = Vec::new();
        let mut current = Some(id.to_string());

        while let Some(next) = current {
            if chain.iter().any(|s| s.id == next) {
                let mut cycle: Vec<String> = chain.iter().map(|s| s.id.clone()).collect();
                cycle.push(next);
                return Err(RuleError::CyclicPrecedence(cycle));
            }
            let spec = self
                .get(&next)
                .ok_or_else(|| RuleError::UnknownRuleSet(next.clone()))?;
            chain.push(spec);
            current = spec.extends.clone();
        }

        let Some((head, ancestors)) = chain.split_first() else {
            return Err(RuleError::UnknownRuleSet(id.to_string()));
        };
        let mut resolved = (*head).clone();
        resolved.extends = None;

        for parent in ancestors {
            for rule in &parent.weight_rules {
                if !resolved.weight_rules.iter().any(|r| r.id == rule.id) {
                    resolved.weight_rules.push(rule.clone());
                }
            }
            for rule in &parent.category_rules {
                if !resolved.category_rules.iter().any(|r| r.id == rule.id) {
                    resolved.category_rules.push(rule.clone());
                }
            }
        }
        Ok(resolved)
    }

    /// Resolve and compile a rule set.
    pub fn classifier(&self, id: &str) -> RuleResult<Classifier> {
        Classifier::new(&self.resolve(id)?)
    }

    /// Compile the active rule set.
    pub fn active_classifier(&self) -> RuleResult<Classifier> {
        let id = self
            .active_id()
            .ok_or_else(|| RuleError::UnknownRuleSet("<active>".to_string()))?;
        self.classifier(id)
    }
}
