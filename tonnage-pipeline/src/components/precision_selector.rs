use crate::calibration::CandidateOutcome;
use crate::selector::Selector;

/// Ranks calibration outcomes by overall precision.
///
/// Disqualified outcomes score NaN and sink to the end; equal precisions
/// keep candidate order, so ties go to the earlier candidate.
#[derive(Default)]
pub struct PrecisionSelector {
    pub limit: Option<usize>,
}

impl<'a> Selector<&'a CandidateOutcome> for PrecisionSelector {
    fn score(&self, outcome: &&'a CandidateOutcome) -> f64 {
        outcome.ranking_precision()
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }
}
