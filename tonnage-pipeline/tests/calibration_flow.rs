//! End-to-end runs over the shared fixtures: load, aggregate, calibrate,
//! publish.

use std::collections::BTreeMap;
use std::io::Write;

use tonnage_pipeline::calibration::CalibrationStatus;
use tonnage_pipeline::components::csv_movement_source::CsvMovementSource;
use tonnage_pipeline::components::json_file_sink::JsonFileSink;
use tonnage_pipeline::components::logging_sink::LoggingSink;
use tonnage_pipeline::loader::{load_movements, load_reference};
use tonnage_pipeline::sink::{publish_all, ResultSink, SinkInput};
use tonnage_pipeline::source::MovementSource;
use tonnage_pipeline::{
    aggregate, CalibrationEngine, CalibrationPlan, CalibrationResult, CancelToken, FilterPolicy,
    Grouping, MovementBatch, Period, ReferenceTargetStore, StoppingRule,
};
use tonnage_rules::RuleCatalog;

const CATALOG: &str = include_str!("../../fixtures/catalog.toml");
const MOVEMENTS: &str = include_str!("../../fixtures/movements.csv");
const TARGETS: &str = include_str!("../../fixtures/targets.csv");
const PLAN: &str = include_str!("../../fixtures/plan.toml");

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn catalog() -> RuleCatalog {
    RuleCatalog::from_toml_str(CATALOG).unwrap()
}

fn batch() -> MovementBatch {
    load_movements(MOVEMENTS.as_bytes()).unwrap()
}

fn reference() -> ReferenceTargetStore {
    load_reference(TARGETS.as_bytes()).unwrap()
}

fn month(m: u32) -> Period {
    Period::Month { year: 2024, month: m }
}

fn mass_by_period(policy: &FilterPolicy) -> BTreeMap<Period, f64> {
    let batch = batch();
    let classifier = catalog().active_classifier().unwrap();
    aggregate(&batch.movements, &batch.products, &classifier, policy)
        .unwrap()
        .mass_by_period()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

fn run_plan(plan: &CalibrationPlan) -> CalibrationResult {
    let catalog = catalog();
    let batch = batch();
    let candidates = plan.candidates(&catalog).unwrap();
    CalibrationEngine::new(&batch.products, plan.config())
        .run(&candidates, &batch.movements, &reference())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[test]
fn sales_only_counts_invoices_and_flags_services() {
    let batch = batch();
    let classifier = catalog().active_classifier().unwrap();
    let report = aggregate(
        &batch.movements,
        &batch.products,
        &classifier,
        &FilterPolicy::sales_only(),
    )
    .unwrap();

    assert_eq!(report.rule_set_id, "sugar-v2");
    let totals = report.mass_by_period();
    assert_close(totals[&month(1)], 2000.0);
    assert_close(totals[&month(2)], 2000.0);
    assert_close(totals[&month(3)], 2000.0);
    assert_close(report.total_mass(), 6000.0);

    assert!(!report.data_quality.is_clean());
    assert_eq!(report.data_quality.unclassified.len(), 1);
    assert_eq!(report.data_quality.unclassified[0].product_code, "XSERV");
    assert_eq!(report.data_quality.unclassified_movements, 1);
}

#[test]
fn netting_subtracts_returns_and_cancellations() {
    let totals = mass_by_period(&FilterPolicy::netted_sales());
    assert_close(totals[&month(1)], 1900.0);
    assert_close(totals[&month(2)], 1900.0);
    assert_close(totals[&month(3)], 2000.0);
}

#[test]
fn product_level_exclusion_drops_every_movement_of_returned_products() {
    let totals = mass_by_period(&FilterPolicy::never_returned_sales());
    assert_close(totals[&month(1)], 1000.0);
    assert_close(totals[&month(2)], 500.0);
    assert_close(totals[&month(3)], 2000.0);
}

#[test]
fn child_rule_set_overrides_parent_classification() {
    let batch = batch();
    let policy = FilterPolicy::sales_only().with_grouping(Grouping {
        by_category: true,
        ..Grouping::default()
    });
    let classifier = catalog().active_classifier().unwrap();
    let report = aggregate(&batch.movements, &batch.products, &classifier, &policy).unwrap();

    let brown: Vec<_> = report
        .contributions
        .iter()
        .filter(|c| c.product_code == "MREGR25")
        .collect();
    assert_eq!(brown.len(), 1);
    assert_eq!(brown[0].rule_id, "brown-25");

    let february_categories: Vec<(&str, f64)> = report
        .buckets
        .iter()
        .filter(|b| b.key.period == month(2))
        .map(|b| (b.key.category.as_deref().unwrap_or(""), b.total_mass))
        .collect();
    assert_eq!(february_categories, vec![("brown", 500.0), ("standard", 1500.0)]);
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

#[test]
fn plan_accepts_first_candidate_over_threshold() {
    let plan = CalibrationPlan::from_toml_str(PLAN).unwrap();
    let result = run_plan(&plan);

    assert_eq!(result.status, CalibrationStatus::Accepted);
    assert_eq!(result.total_candidates, 6);
    assert_eq!(result.evaluated(), 2);
    let best = result.best.as_ref().unwrap();
    assert_eq!(best.candidate_id, "sugar-v2/base/netted-sales");
    assert_eq!(result.rule_set_id(), Some("sugar-v2/base"));
    assert_close(best.overall_precision, 100.0);

    let sales_only = result.outcomes[0].score().unwrap();
    assert!(!sales_only.meets_threshold);
    assert_close(sales_only.overall_precision, 100.0 * (1.0 - 200.0 / 5800.0));
}

#[test]
fn exhaustive_plan_ranks_every_candidate() {
    let mut plan = CalibrationPlan::from_toml_str(PLAN).unwrap();
    plan.stopping = StoppingRule::Exhaustive;
    let result = run_plan(&plan);

    assert_eq!(result.status, CalibrationStatus::Accepted);
    assert_eq!(result.evaluated(), 6);
    assert_eq!(
        result.best.as_ref().unwrap().candidate_id,
        "sugar-v2/base/netted-sales"
    );

    let ranking: Vec<&str> = result.ranking().iter().map(|o| o.candidate_id()).collect();
    assert_eq!(ranking[0], "sugar-v2/base/netted-sales");
    assert_eq!(ranking[1], "sugar-v2/light-sacks/netted-sales");
    assert_eq!(ranking[5], "sugar-v2/light-sacks/never-returned-sales");
}

#[test]
fn parallel_run_matches_sequential_run() {
    let plan = CalibrationPlan::from_toml_str(PLAN).unwrap();
    let sequential = run_plan(&plan);
    let parallel = run_plan(&CalibrationPlan {
        parallel: true,
        ..plan
    });

    assert_eq!(parallel.status, sequential.status);
    assert_eq!(parallel.best, sequential.best);
}

#[test]
fn unreachable_threshold_exhausts_with_best_effort() {
    let plan = CalibrationPlan {
        threshold: 100.5,
        ..CalibrationPlan::from_toml_str(PLAN).unwrap()
    };
    let result = run_plan(&plan);
    assert_eq!(result.status, CalibrationStatus::Exhausted);
    assert!(!result.meets_threshold());
    assert_eq!(
        result.best.as_ref().unwrap().candidate_id,
        "sugar-v2/base/netted-sales"
    );
}

#[test]
fn best_candidate_reports_top_contributors() {
    let plan = CalibrationPlan::from_toml_str(PLAN).unwrap();
    let result = run_plan(&plan);
    let best = result.best.as_ref().unwrap();

    let january = best
        .top_contributors
        .iter()
        .find(|p| p.period == month(1))
        .unwrap();
    assert!(january.contributors.len() <= 3);
    assert_eq!(january.contributors[0].product_code, "PESGR25");
    assert_close(january.contributors[0].mass, 900.0);
}

#[test]
fn cancelled_before_start_reports_nothing_accepted() {
    let plan = CalibrationPlan::from_toml_str(PLAN).unwrap();
    let catalog = catalog();
    let batch = batch();
    let candidates = plan.candidates(&catalog).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = CalibrationEngine::new(&batch.products, plan.config())
        .with_cancel_token(cancel)
        .run(&candidates, &batch.movements, &reference())
        .unwrap();
    assert_eq!(result.status, CalibrationStatus::Cancelled);
    assert!(result.best.is_none());
}

// ---------------------------------------------------------------------------
// Source and sinks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn csv_source_feeds_calibration_and_json_sink_records_it() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MOVEMENTS.as_bytes()).unwrap();

    let batch = CsvMovementSource::new(file.path()).fetch().await.unwrap();
    assert_eq!(batch.movements.len(), 11);
    assert_eq!(batch.products.len(), 5);

    let plan = CalibrationPlan::from_toml_str(PLAN).unwrap();
    let candidates = plan.candidates(&catalog()).unwrap();
    let result = CalibrationEngine::new(&batch.products, plan.config())
        .run(&candidates, &batch.movements, &reference())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("calibration.json");
    let sinks: Vec<Box<dyn ResultSink<CalibrationResult>>> =
        vec![Box::new(LoggingSink), Box::new(JsonFileSink::new(&out))];
    let failures = publish_all(&sinks, SinkInput::new("fixture-run", result)).await;
    assert!(failures.is_empty());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["status"], "accepted");
    assert_eq!(written["best"]["candidate_id"], "sugar-v2/base/netted-sales");
    assert_eq!(written["outcomes"][0]["outcome"], "scored");
}
