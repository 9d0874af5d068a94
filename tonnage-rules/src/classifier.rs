//! Ordered first-match classifier.
//!
//! A compiled rule set holds two independent ordered lists:
//! - weight rules: first match decides kilograms per sold unit
//! - category rules: first match decides the category label
//!
//! A product that no weight rule matches is `Unclassified`. That is a value,
//! not an error; the aggregator counts it as zero mass and reports it.

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::RuleResult;
use crate::pattern::Pattern;
use crate::product::{NormalizedProduct, ProductDescriptor};
use crate::rule_set::RuleSetSpec;

/// Outcome of classifying one product.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Classified {
        /// Kilograms per sold unit.
        weight_factor: f64,
        category: String,
        /// Weight rule that fired.
        rule_id: String,
    },
    Unclassified {
        category: String,
    },
}

impl Classification {
    pub fn weight_factor(&self) -> Option<f64> {
        match self {
            Classification::Classified { weight_factor, .. } => Some(*weight_factor),
            Classification::Unclassified { .. } => None,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Classification::Classified { category, .. }
            | Classification::Unclassified { category } => category,
        }
    }

    pub fn rule_id(&self) -> Option<&str> {
        match self {
            Classification::Classified { rule_id, .. } => Some(rule_id),
            Classification::Unclassified { .. } => None,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Classification::Classified { .. })
    }
}

#[derive(Debug)]
struct CompiledWeightRule {
    id: String,
    pattern: Pattern,
    factor_kg: f64,
}

#[derive(Debug)]
struct CompiledCategoryRule {
    pattern: Pattern,
    label: String,
}

/// A compiled, immutable rule set.
#[derive(Debug)]
pub struct Classifier {
    rule_set_id: String,
    version: u32,
    weight_rules: Vec<CompiledWeightRule>,
    category_rules: Vec<CompiledCategoryRule>,
    default_category: String,
}

impl Classifier {
    /// Validate and compile a rule set. Any malformed rule fails the whole set.
    pub fn new(spec: &RuleSetSpec) -> RuleResult<Self> {
        spec.validate()?;

        let weight_rules = spec
            .weight_rules
            .iter()
            .map(|rule| {
                Ok(CompiledWeightRule {
                    id: rule.id.clone(),
                    pattern: rule.pattern.compile(&rule.id)?,
                    factor_kg: rule.factor_kg(),
                })
            })
            .collect::<RuleResult<Vec<_>>>()?;

        let category_rules = spec
            .category_rules
            .iter()
            .map(|rule| {
                Ok(CompiledCategoryRule {
                    pattern: rule.pattern.compile(&rule.id)?,
                    label: rule.label.clone(),
                })
            })
            .collect::<RuleResult<Vec<_>>>()?;

        debug!(
            "rule_set={} version={} weight_rules={} category_rules={} compiled",
            spec.id,
            spec.version,
            weight_rules.len(),
            category_rules.len()
        );

        Ok(Self {
            rule_set_id: spec.id.clone(),
            version: spec.version,
            weight_rules,
            category_rules,
            default_category: spec.default_category.clone(),
        })
    }

    pub fn rule_set_id(&self) -> &str {
        &self.rule_set_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn weight_rule_count(&self) -> usize {
        self.weight_rules.len()
    }

    /// Classify one product. Never fails; blank input is `Unclassified`.
    pub fn classify(&self, product: &ProductDescriptor) -> Classification {
        let normalized = NormalizedProduct::from_descriptor(product);
        if normalized.is_blank() {
            return Classification::Unclassified {
                category: self.default_category.clone(),
            };
        }

        let category = self
            .category_rules
            .iter()
            .find(|rule| rule.pattern.matches(&normalized))
            .map_or_else(|| self.default_category.clone(), |rule| rule.label.clone());

        match self
            .weight_rules
            .iter()
            .find(|rule| rule.pattern.matches(&normalized))
        {
            Some(rule) => Classification::Classified {
                weight_factor: rule.factor_kg,
                category,
                rule_id: rule.id.clone(),
            },
            None => Classification::Unclassified { category },
        }
    }

    /// Classify a batch of products in parallel. Output order matches input.
    pub fn classify_batch(&self, products: &[ProductDescriptor]) -> Vec<Classification> {
        products.par_iter().map(|p| self.classify(p)).collect()
    }
}
