//! Calibration: search over `(rule set, policy)` candidates until computed
//! totals match the reference targets within a precision threshold.
//!
//! Per candidate the engine runs AGGREGATE -> SCORE -> DECIDE and either
//! accepts or tries the next one. The run ends `Accepted`, `Exhausted` or
//! `Cancelled`, and always returns a complete `CalibrationResult`.

pub mod cancel;
pub mod engine;
pub mod grid;
pub mod scoring;

use serde::{Deserialize, Serialize, Serializer};
use tonnage_rules::RuleSetSpec;

use crate::aggregator::DataQualityReport;
use crate::error::CandidateFailure;
use crate::policy::FilterPolicy;
use crate::types::Period;

pub use cancel::CancelToken;
pub use engine::CalibrationEngine;
pub use grid::{CandidateGrid, FactorVariant};

/// Default acceptance threshold, in percent.
pub const DEFAULT_THRESHOLD: f64 = 90.0;

/// One full variant to evaluate.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub id: String,
    pub rule_set: RuleSetSpec,
    pub policy: FilterPolicy,
}

impl Candidate {
    pub fn new(id: impl Into<String>, rule_set: RuleSetSpec, policy: FilterPolicy) -> Self {
        Self {
            id: id.into(),
            rule_set,
            policy,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppingRule {
    /// Stop at the first candidate (in candidate order) that meets the threshold.
    #[default]
    FirstAccepted,
    /// Evaluate everything and keep the highest precision.
    Exhaustive,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationConfig {
    pub threshold: f64,
    pub stopping: StoppingRule,
    pub parallel: bool,
    /// Contributors listed per period in diagnostics.
    pub top_contributors: usize,
    /// Disqualify candidates that leave a reference period uncomputed.
    pub require_full_coverage: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            stopping: StoppingRule::FirstAccepted,
            parallel: false,
            top_contributors: 5,
            require_full_coverage: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    /// The reported candidate meets the threshold.
    Accepted,
    /// Every candidate was evaluated; none met the threshold.
    Exhausted,
    /// Stopped early by the cancel token; only fully scored candidates are reported.
    Cancelled,
}

/// Comparison of one period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodScore {
    pub period: Period,
    pub computed: f64,
    pub expected: f64,
    pub absolute_error: f64,
    /// `None` when the expected total is zero.
    pub relative_error_pct: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Contributor {
    pub product_code: String,
    pub product_name: String,
    pub rule_id: String,
    pub mass: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodContributors {
    pub period: Period,
    pub contributors: Vec<Contributor>,
}

/// A candidate that was aggregated and scored.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateScore {
    pub index: usize,
    pub candidate_id: String,
    pub rule_set_id: String,
    pub policy: String,
    pub periods: Vec<PeriodScore>,
    pub overall_precision: f64,
    pub meets_threshold: bool,
    pub computed_total: f64,
    pub expected_total: f64,
    /// Computed periods with no reference target.
    pub reference_gaps: Vec<Period>,
    /// Reference periods with no computed total.
    pub missing_periods: Vec<Period>,
    pub top_contributors: Vec<PeriodContributors>,
    pub data_quality: DataQualityReport,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Scored(CandidateScore),
    Disqualified {
        index: usize,
        candidate_id: String,
        rule_set_id: String,
        #[serde(serialize_with = "serialize_display")]
        reason: CandidateFailure,
    },
}

fn serialize_display<S: Serializer>(value: &CandidateFailure, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl CandidateOutcome {
    pub fn index(&self) -> usize {
        match self {
            CandidateOutcome::Scored(score) => score.index,
            CandidateOutcome::Disqualified { index, .. } => *index,
        }
    }

    pub fn candidate_id(&self) -> &str {
        match self {
            CandidateOutcome::Scored(score) => &score.candidate_id,
            CandidateOutcome::Disqualified { candidate_id, .. } => candidate_id,
        }
    }

    pub fn score(&self) -> Option<&CandidateScore> {
        match self {
            CandidateOutcome::Scored(score) => Some(score),
            CandidateOutcome::Disqualified { .. } => None,
        }
    }

    /// Precision used for ranking; disqualified candidates rank last.
    pub fn ranking_precision(&self) -> f64 {
        self.score().map_or(f64::NAN, |s| s.overall_precision)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationResult {
    pub status: CalibrationStatus,
    pub threshold: f64,
    pub stopping: StoppingRule,
    pub total_candidates: usize,
    /// Best candidate: the accepted one, or the highest precision otherwise.
    pub best: Option<CandidateScore>,
    /// Evaluated candidates in candidate order.
    pub outcomes: Vec<CandidateOutcome>,
}

impl CalibrationResult {
    pub fn rule_set_id(&self) -> Option<&str> {
        self.best.as_ref().map(|b| b.rule_set_id.as_str())
    }

    pub fn overall_precision(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.overall_precision)
    }

    pub fn meets_threshold(&self) -> bool {
        self.best.as_ref().is_some_and(|b| b.meets_threshold)
    }

    pub fn periods(&self) -> &[PeriodScore] {
        match &self.best {
            Some(best) => &best.periods,
            None => &[],
        }
    }

    pub fn evaluated(&self) -> usize {
        self.outcomes.len()
    }

    pub fn disqualified(&self) -> impl Iterator<Item = &CandidateOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CandidateOutcome::Disqualified { .. }))
    }

    /// Outcomes from best to worst; disqualified last, ties in candidate order.
    pub fn ranking(&self) -> Vec<&CandidateOutcome> {
        use crate::components::precision_selector::PrecisionSelector;
        use crate::selector::Selector;

        PrecisionSelector::default().select(self.outcomes.iter().collect())
    }

    /// The first `n` entries of [`ranking`](Self::ranking).
    pub fn top_ranked(&self, n: usize) -> Vec<&CandidateOutcome> {
        use crate::components::precision_selector::PrecisionSelector;
        use crate::selector::Selector;

        PrecisionSelector { limit: Some(n) }.select(self.outcomes.iter().collect())
    }
}
