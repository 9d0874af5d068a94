//! Precision scoring against reference targets.
//!
//! `overall_precision = 100 * (1 - sum|computed - expected| / sum expected)`
//! over the periods present on both sides. Periods on only one side are
//! reported, never scored.

use std::collections::BTreeMap;

use crate::error::CandidateFailure;
use crate::reference::ReferenceTargetStore;
use crate::summation::NeumaierSum;
use crate::types::Period;

use super::PeriodScore;

/// Per-period comparison of one candidate's totals.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub periods: Vec<PeriodScore>,
    pub reference_gaps: Vec<Period>,
    pub missing_periods: Vec<Period>,
}

impl Comparison {
    pub fn computed_total(&self) -> f64 {
        self.periods.iter().map(|p| p.computed).collect::<NeumaierSum>().total()
    }

    pub fn expected_total(&self) -> f64 {
        self.periods.iter().map(|p| p.expected).collect::<NeumaierSum>().total()
    }
}

pub fn compare(computed: &BTreeMap<Period, f64>, reference: &ReferenceTargetStore) -> Comparison {
    let mut periods = Vec::new();
    let mut reference_gaps = Vec::new();

    for (period, &value) in computed {
        match reference.get(period) {
            Some(expected) => {
                let absolute_error = (value - expected).abs();
                periods.push(PeriodScore {
                    period: *period,
                    computed: value,
                    expected,
                    absolute_error,
                    relative_error_pct: (expected > 0.0).then(|| absolute_error / expected * 100.0),
                });
            }
            None => reference_gaps.push(*period),
        }
    }

    let missing_periods = reference
        .periods()
        .filter(|p| !computed.contains_key(p))
        .copied()
        .collect();

    Comparison {
        periods,
        reference_gaps,
        missing_periods,
    }
}

pub fn precision(periods: &[PeriodScore]) -> Result<f64, CandidateFailure> {
    if periods.is_empty() {
        return Err(CandidateFailure::NoComparablePeriods);
    }
    if periods.iter().any(|p| !p.computed.is_finite()) {
        return Err(CandidateFailure::NonFiniteTotal);
    }
    let error: NeumaierSum = periods.iter().map(|p| p.absolute_error).collect();
    let expected: NeumaierSum = periods.iter().map(|p| p.expected).collect();
    if expected.total() <= 0.0 {
        return Err(CandidateFailure::ZeroExpectedTotal);
    }
    Ok(100.0 * (1.0 - error.total() / expected.total()))
}
