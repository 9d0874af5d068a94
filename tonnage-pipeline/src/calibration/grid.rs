//! Candidate enumeration.
//!
//! A grid is base rule set x factor variants x policies. Factor variants are
//! the outer loop, so candidates that share a rule set are adjacent. Ids are
//! `<rule_set>/<factor variant>/<policy>`.

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};
use tonnage_rules::{FactorOverride, RuleSetSpec};

use crate::error::CalibrationError;
use crate::policy::FilterPolicy;

use super::Candidate;

/// Name of the implicit variant with no overrides.
pub const BASE_VARIANT: &str = "base";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorVariant {
    pub name: String,
    #[serde(default)]
    pub overrides: Vec<FactorOverride>,
}

impl FactorVariant {
    pub fn new(name: impl Into<String>, overrides: Vec<FactorOverride>) -> Self {
        Self {
            name: name.into(),
            overrides,
        }
    }

    pub fn base() -> Self {
        Self::new(BASE_VARIANT, Vec::new())
    }
}

#[derive(Clone, Debug)]
pub struct CandidateGrid {
    base: RuleSetSpec,
    factor_variants: Vec<FactorVariant>,
    policies: Vec<FilterPolicy>,
    max_candidates: Option<usize>,
}

impl CandidateGrid {
    pub fn new(base: RuleSetSpec) -> Self {
        Self {
            base,
            factor_variants: Vec::new(),
            policies: Vec::new(),
            max_candidates: None,
        }
    }

    pub fn with_factor_variant(mut self, variant: FactorVariant) -> Self {
        self.factor_variants.push(variant);
        self
    }

    pub fn with_policy(mut self, policy: FilterPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = Some(max);
        self
    }

    /// Number of candidates before the cap is applied.
    pub fn size(&self) -> usize {
        self.factor_variants.len().max(1) * self.policies.len().max(1)
    }

    pub fn candidates(&self) -> Result<Vec<Candidate>, CalibrationError> {
        let default_variants = [FactorVariant::base()];
        let default_policies = [FilterPolicy::default()];
        let variants: &[FactorVariant] = if self.factor_variants.is_empty() {
            &default_variants
        } else {
            &self.factor_variants
        };
        let policies: &[FilterPolicy] = if self.policies.is_empty() {
            &default_policies
        } else {
            &self.policies
        };

        let mut names = HashSet::new();
        for variant in variants {
            if !names.insert(variant.name.as_str()) {
                return Err(CalibrationError::InvalidGrid(format!(
                    "duplicate factor variant '{}'",
                    variant.name
                )));
            }
        }

        let limit = self.max_candidates.unwrap_or(usize::MAX);
        let mut candidates = Vec::with_capacity(self.size().min(limit));

        'variants: for variant in variants {
            let rule_set_id = format!("{}/{}", self.base.id, variant.name);
            let rule_set = self.base.with_overrides(rule_set_id, &variant.overrides)?;
            for policy in policies {
                if candidates.len() == limit {
                    break 'variants;
                }
                let id = format!("{}/{}/{}", self.base.id, variant.name, policy.name);
                candidates.push(Candidate::new(id, rule_set.clone(), policy.clone()));
            }
        }

        if candidates.len() < self.size() {
            warn!(
                "grid base={} truncated from {} to {} candidates",
                self.base.id,
                self.size(),
                candidates.len()
            );
        }
        Ok(candidates)
    }
}
