use std::sync::Arc;

use async_trait::async_trait;

use crate::aggregator::AggregationReport;
use crate::calibration::CalibrationResult;
use crate::error::SinkError;
use crate::sink::{ResultSink, SinkInput};

/// Writes a one-line summary of each result to the log.
pub struct LoggingSink;

#[async_trait]
impl ResultSink<CalibrationResult> for LoggingSink {
    async fn publish(&self, input: Arc<SinkInput<CalibrationResult>>) -> Result<(), SinkError> {
        let result = &input.result;
        log::info!(
            "run_id={} status={:?} best={} precision={} evaluated={}/{}",
            input.run_id,
            result.status,
            result.best.as_ref().map_or("-", |b| b.candidate_id.as_str()),
            result
                .overall_precision()
                .map_or_else(|| "-".to_string(), |p| format!("{p:.3}")),
            result.evaluated(),
            result.total_candidates
        );
        Ok(())
    }
}

#[async_trait]
impl ResultSink<AggregationReport> for LoggingSink {
    async fn publish(&self, input: Arc<SinkInput<AggregationReport>>) -> Result<(), SinkError> {
        let report = &input.result;
        log::info!(
            "run_id={} rule_set={} policy={} buckets={} total_mass_kg={:.3} unclassified_products={}",
            input.run_id,
            report.rule_set_id,
            report.policy,
            report.buckets.len(),
            report.total_mass(),
            report.data_quality.unclassified.len()
        );
        Ok(())
    }
}
