use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use rayon::prelude::*;
use tonnage_rules::Classifier;

use crate::aggregator::{AggregationReport, Aggregator};
use crate::components::contributor_selector::ContributorSelector;
use crate::components::precision_selector::PrecisionSelector;
use crate::error::{CalibrationError, CandidateFailure, PipelineError};
use crate::products::ProductCatalog;
use crate::reference::ReferenceTargetStore;
use crate::selector::Selector;
use crate::types::{Movement, Period};

use super::scoring;
use super::{
    CalibrationConfig, CalibrationResult, CalibrationStatus, CancelToken, Candidate,
    CandidateOutcome, CandidateScore, Contributor, PeriodContributors, StoppingRule,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    Accept,
    TryNext,
}

/// Evaluates candidates against reference targets.
///
/// Evaluation is pure: each candidate compiles its own classifier and
/// aggregates the shared, read-only movement slice. The active production
/// rule set is never touched.
pub struct CalibrationEngine<'a> {
    products: &'a ProductCatalog,
    config: CalibrationConfig,
    cancel: CancelToken,
}

impl<'a> CalibrationEngine<'a> {
    pub fn new(products: &'a ProductCatalog, config: CalibrationConfig) -> Self {
        Self {
            products,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn run(
        &self,
        candidates: &[Candidate],
        movements: &[Movement],
        reference: &ReferenceTargetStore,
    ) -> Result<CalibrationResult, CalibrationError> {
        self.check_run(candidates, reference)?;
        info!(
            "calibration candidates={} movements={} reference_periods={} threshold={:.2} stopping={:?} parallel={}",
            candidates.len(),
            movements.len(),
            reference.len(),
            self.config.threshold,
            self.config.stopping,
            self.config.parallel
        );

        let (outcomes, cancelled) = if self.config.parallel {
            self.evaluate_parallel(candidates, movements, reference)
        } else {
            self.evaluate_sequential(candidates, movements, reference)
        };

        let accepted = match self.config.stopping {
            StoppingRule::FirstAccepted if !cancelled => outcomes
                .iter()
                .filter_map(CandidateOutcome::score)
                .find(|s| s.meets_threshold)
                .cloned(),
            _ => None,
        };
        let best = accepted.or_else(|| {
            PrecisionSelector::default()
                .select(outcomes.iter().collect())
                .into_iter()
                .find_map(CandidateOutcome::score)
                .cloned()
        });

        let status = if cancelled {
            CalibrationStatus::Cancelled
        } else if best.as_ref().is_some_and(|b| b.meets_threshold) {
            CalibrationStatus::Accepted
        } else {
            CalibrationStatus::Exhausted
        };

        match &best {
            Some(b) => info!(
                "calibration status={:?} best={} precision={:.3} evaluated={}/{}",
                status,
                b.candidate_id,
                b.overall_precision,
                outcomes.len(),
                candidates.len()
            ),
            None => warn!(
                "calibration status={:?} no candidate could be scored evaluated={}/{}",
                status,
                outcomes.len(),
                candidates.len()
            ),
        }

        Ok(CalibrationResult {
            status,
            threshold: self.config.threshold,
            stopping: self.config.stopping,
            total_candidates: candidates.len(),
            best,
            outcomes,
        })
    }

    /// Run-level configuration problems are fatal before any candidate runs.
    fn check_run(
        &self,
        candidates: &[Candidate],
        reference: &ReferenceTargetStore,
    ) -> Result<(), CalibrationError> {
        let threshold = self.config.threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(CalibrationError::InvalidThreshold(threshold));
        }
        if candidates.is_empty() {
            return Err(CalibrationError::NoCandidates);
        }
        let mut ids = HashSet::new();
        for candidate in candidates {
            if !ids.insert(candidate.id.as_str()) {
                return Err(CalibrationError::DuplicateCandidate(candidate.id.clone()));
            }
        }
        if reference.is_empty() {
            return Err(CalibrationError::EmptyReference);
        }
        Ok(())
    }

    fn evaluate_sequential(
        &self,
        candidates: &[Candidate],
        movements: &[Movement],
        reference: &ReferenceTargetStore,
    ) -> (Vec<CandidateOutcome>, bool) {
        let mut outcomes = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("calibration cancelled before candidate={}", candidate.id);
                return (outcomes, true);
            }
            let outcome = self.evaluate(index, candidate, movements, reference);
            let decision = decide(&outcome);
            log_decision(&outcome, decision);
            outcomes.push(outcome);
            if decision == Decision::Accept && self.config.stopping == StoppingRule::FirstAccepted {
                break;
            }
        }
        (outcomes, false)
    }

    /// Candidates run on the rayon pool. Under `FirstAccepted` the lowest
    /// accepted index wins and later candidates are dropped, so the result
    /// matches the sequential run.
    fn evaluate_parallel(
        &self,
        candidates: &[Candidate],
        movements: &[Movement],
        reference: &ReferenceTargetStore,
    ) -> (Vec<CandidateOutcome>, bool) {
        let first_accepted = self.config.stopping == StoppingRule::FirstAccepted;
        let accepted_at = AtomicUsize::new(usize::MAX);

        let slots: Vec<Option<CandidateOutcome>> = candidates
            .par_iter()
            .enumerate()
            .map(|(index, candidate)| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                if first_accepted && index > accepted_at.load(Ordering::SeqCst) {
                    return None;
                }
                let outcome = self.evaluate(index, candidate, movements, reference);
                let decision = decide(&outcome);
                log_decision(&outcome, decision);
                if first_accepted && decision == Decision::Accept {
                    accepted_at.fetch_min(index, Ordering::SeqCst);
                }
                Some(outcome)
            })
            .collect();

        let cut = accepted_at.into_inner();
        let mut outcomes = Vec::new();
        let mut cancelled = false;
        for (index, slot) in slots.into_iter().enumerate() {
            if index > cut {
                break;
            }
            match slot {
                Some(outcome) => outcomes.push(outcome),
                None => cancelled = true,
            }
        }
        (outcomes, cancelled)
    }

    fn evaluate(
        &self,
        index: usize,
        candidate: &Candidate,
        movements: &[Movement],
        reference: &ReferenceTargetStore,
    ) -> CandidateOutcome {
        let disqualify = |reason: CandidateFailure| {
            warn!("candidate={} disqualified: {}", candidate.id, reason);
            CandidateOutcome::Disqualified {
                index,
                candidate_id: candidate.id.clone(),
                rule_set_id: candidate.rule_set.id.clone(),
                reason,
            }
        };

        let classifier = match Classifier::new(&candidate.rule_set) {
            Ok(classifier) => classifier,
            Err(e) => return disqualify(CandidateFailure::RuleSet(e.to_string())),
        };
        let report = match Aggregator::new(&classifier, self.products)
            .aggregate(movements, &candidate.policy)
        {
            Ok(report) => report,
            Err(PipelineError::InvalidPolicy { reason, .. }) => {
                return disqualify(CandidateFailure::Policy(reason))
            }
            Err(PipelineError::Rules(e)) => return disqualify(CandidateFailure::RuleSet(e.to_string())),
        };

        let comparison = scoring::compare(&report.mass_by_period(), reference);
        if self.config.require_full_coverage && !comparison.missing_periods.is_empty() {
            let missing: Vec<String> = comparison.missing_periods.iter().map(Period::to_string).collect();
            return disqualify(CandidateFailure::IncompleteCoverage(missing.join(", ")));
        }
        let overall_precision = match scoring::precision(&comparison.periods) {
            Ok(p) => p,
            Err(reason) => return disqualify(reason),
        };
        debug!(
            "candidate={} compared_periods={} reference_gaps={} missing_periods={}",
            candidate.id,
            comparison.periods.len(),
            comparison.reference_gaps.len(),
            comparison.missing_periods.len()
        );

        CandidateOutcome::Scored(CandidateScore {
            index,
            candidate_id: candidate.id.clone(),
            rule_set_id: candidate.rule_set.id.clone(),
            policy: candidate.policy.name.clone(),
            computed_total: comparison.computed_total(),
            expected_total: comparison.expected_total(),
            meets_threshold: overall_precision >= self.config.threshold,
            overall_precision,
            top_contributors: self.top_contributors(&report),
            periods: comparison.periods,
            reference_gaps: comparison.reference_gaps,
            missing_periods: comparison.missing_periods,
            data_quality: report.data_quality,
        })
    }

    fn top_contributors(&self, report: &AggregationReport) -> Vec<PeriodContributors> {
        if self.config.top_contributors == 0 {
            return Vec::new();
        }
        let mut by_period: BTreeMap<Period, Vec<Contributor>> = BTreeMap::new();
        for c in &report.contributions {
            by_period.entry(c.period).or_default().push(Contributor {
                product_code: c.product_code.clone(),
                product_name: c.product_name.clone(),
                rule_id: c.rule_id.clone(),
                mass: c.mass,
            });
        }
        let selector = ContributorSelector {
            k: self.config.top_contributors,
        };
        by_period
            .into_iter()
            .map(|(period, contributors)| PeriodContributors {
                period,
                contributors: selector.select(contributors),
            })
            .collect()
    }
}

fn decide(outcome: &CandidateOutcome) -> Decision {
    match outcome.score() {
        Some(score) if score.meets_threshold => Decision::Accept,
        _ => Decision::TryNext,
    }
}

fn log_decision(outcome: &CandidateOutcome, decision: Decision) {
    if let CandidateOutcome::Scored(score) = outcome {
        let label = match decision {
            Decision::Accept => "accept",
            Decision::TryNext => "try_next",
        };
        info!(
            "candidate={} precision={:.3} decision={}",
            score.candidate_id, score.overall_precision, label
        );
    }
}

/// Run with default settings and the given threshold.
pub fn run(
    products: &ProductCatalog,
    candidates: &[Candidate],
    movements: &[Movement],
    reference: &ReferenceTargetStore,
    threshold: f64,
) -> Result<CalibrationResult, CalibrationError> {
    let config = CalibrationConfig {
        threshold,
        ..CalibrationConfig::default()
    };
    CalibrationEngine::new(products, config).run(candidates, movements, reference)
}
