//! Calibration plan: the TOML document that describes one calibration run.
//!
//! ```toml
//! threshold = 90.0
//! stopping = "first_accepted"
//! base_rule_set = "sugar-v2"
//! max_candidates = 64
//!
//! [[factor_variants]]
//! name = "base"
//!
//! [[factor_variants]]
//! name = "heavy-sacks"
//! overrides = [{ rule_id = "sack-25", amount = 25.2 }]
//!
//! [[policies]]
//! name = "sales"
//! document_types = ["sale"]
//! ```

use serde::{Deserialize, Serialize};
use tonnage_rules::RuleCatalog;

use crate::calibration::{
    CalibrationConfig, Candidate, CandidateGrid, FactorVariant, StoppingRule, DEFAULT_THRESHOLD,
};
use crate::error::{CalibrationError, LoadResult};
use crate::policy::FilterPolicy;

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_top_contributors() -> usize {
    5
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPlan {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub stopping: StoppingRule,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_top_contributors")]
    pub top_contributors: usize,
    #[serde(default)]
    pub require_full_coverage: bool,
    /// Rule set to vary. Defaults to the catalog's active rule set.
    #[serde(default)]
    pub base_rule_set: Option<String>,
    #[serde(default)]
    pub max_candidates: Option<usize>,
    #[serde(default)]
    pub factor_variants: Vec<FactorVariant>,
    #[serde(default)]
    pub policies: Vec<FilterPolicy>,
}

impl Default for CalibrationPlan {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            stopping: StoppingRule::default(),
            parallel: false,
            top_contributors: default_top_contributors(),
            require_full_coverage: false,
            base_rule_set: None,
            max_candidates: None,
            factor_variants: Vec::new(),
            policies: Vec::new(),
        }
    }
}

impl CalibrationPlan {
    pub fn from_toml_str(text: &str) -> LoadResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn config(&self) -> CalibrationConfig {
        CalibrationConfig {
            threshold: self.threshold,
            stopping: self.stopping,
            parallel: self.parallel,
            top_contributors: self.top_contributors,
            require_full_coverage: self.require_full_coverage,
        }
    }

    /// Build the candidate grid against a rule catalog.
    pub fn grid(&self, catalog: &RuleCatalog) -> Result<CandidateGrid, CalibrationError> {
        let base_id = match &self.base_rule_set {
            Some(id) => id.as_str(),
            None => catalog
                .active_id()
                .ok_or_else(|| CalibrationError::InvalidGrid("catalog has no active rule set".into()))?,
        };
        let base = catalog.resolve(base_id)?;

        let mut grid = CandidateGrid::new(base);
        for variant in &self.factor_variants {
            grid = grid.with_factor_variant(variant.clone());
        }
        for policy in &self.policies {
            grid = grid.with_policy(policy.clone());
        }
        if let Some(max) = self.max_candidates {
            grid = grid.with_max_candidates(max);
        }
        Ok(grid)
    }

    pub fn candidates(&self, catalog: &RuleCatalog) -> Result<Vec<Candidate>, CalibrationError> {
        self.grid(catalog)?.candidates()
    }
}
