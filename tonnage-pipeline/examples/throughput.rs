//! Throughput check for classification, aggregation and calibration.
//!
//! Generates a year of synthetic sugar movements over a few hundred
//! products, then times each stage.
//!
//! Run with:
//!   cargo run --example throughput --release -p tonnage-pipeline

use std::time::Instant;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tonnage_pipeline::calibration::CalibrationStatus;
use tonnage_pipeline::{
    aggregate, CalibrationConfig, CalibrationEngine, CandidateGrid, DocumentType, FactorVariant,
    FilterPolicy, Movement, ProductCatalog, ReferenceTargetStore, StoppingRule,
};
use tonnage_rules::{
    FactorOverride, MassUnit, PatternSpec, ProductDescriptor, RuleSetSpec, WeightRuleSpec,
};

const NUM_MOVEMENTS: usize = 250_000;
const NUM_PRODUCTS: usize = 400;
const SEED: u64 = 7;

const SIZES: &[(&str, &str, f64)] = &[
    ("sack-50", "50 KG", 50.0),
    ("sack-25", "25 KG", 25.0),
    ("bag-5", "5 KG", 5.0),
    ("bag-2", "2 KG", 2.0),
    ("bag-1", "1 KG", 1.0),
];

fn main() {
    println!("=== Tonnage Throughput ===");
    println!();

    // -----------------------------------------------------------------------
    // 1. Synthetic data
    // -----------------------------------------------------------------------
    let gen_start = Instant::now();
    let mut rng = StdRng::seed_from_u64(SEED);
    let products = generate_products(&mut rng);
    let movements = generate_movements(&mut rng);
    println!(
        "Generated {} movements over {} products in {:.3}s",
        movements.len(),
        products.len(),
        gen_start.elapsed().as_secs_f64()
    );
    println!();

    // -----------------------------------------------------------------------
    // 2. Aggregation under the base rule set
    // -----------------------------------------------------------------------
    let base = rule_set();
    let classifier = match tonnage_rules::Classifier::new(&base) {
        Ok(classifier) => classifier,
        Err(e) => {
            eprintln!("rule set failed to compile: {e}");
            return;
        }
    };

    let agg_start = Instant::now();
    let report = match aggregate(&movements, &products, &classifier, &FilterPolicy::netted_sales()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("aggregation failed: {e}");
            return;
        }
    };
    let agg_elapsed = agg_start.elapsed();

    println!("  ┌──────────────────────────────────────────────┐");
    println!("  │  AGGREGATION                                 │");
    println!("  ├──────────────────────────────────────────────┤");
    println!("  │  Movements:    {:>12}                  │", movements.len());
    println!("  │  Buckets:      {:>12}                  │", report.buckets.len());
    println!("  │  Total (t):    {:>12.1}                  │", report.total_mass() / 1000.0);
    println!("  │  Time:         {:>12.3}s                 │", agg_elapsed.as_secs_f64());
    println!(
        "  │  Throughput:   {:>12.0} mov/s             │",
        movements.len() as f64 / agg_elapsed.as_secs_f64()
    );
    println!("  └──────────────────────────────────────────────┘");
    println!();

    // -----------------------------------------------------------------------
    // 3. Calibration over a factor grid
    // -----------------------------------------------------------------------
    // Targets are the base totals scaled by 2%, so no candidate is exact.
    let reference = match ReferenceTargetStore::from_pairs(
        report
            .mass_by_period()
            .into_iter()
            .map(|(period, mass)| (period, mass * 1.02)),
    ) {
        Ok(reference) => reference,
        Err(e) => {
            eprintln!("reference rejected: {e}");
            return;
        }
    };

    let mut grid = CandidateGrid::new(base)
        .with_policy(FilterPolicy::sales_only())
        .with_policy(FilterPolicy::netted_sales());
    for step in 0..8 {
        let amount = 24.5 + step as f64 * 0.25;
        grid = grid.with_factor_variant(FactorVariant::new(
            format!("sack-25-{amount:.2}"),
            vec![FactorOverride::new("sack-25", amount)],
        ));
    }
    let candidates = match grid.candidates() {
        Ok(candidates) => candidates,
        Err(e) => {
            eprintln!("grid rejected: {e}");
            return;
        }
    };

    for parallel in [false, true] {
        let config = CalibrationConfig {
            threshold: 99.0,
            stopping: StoppingRule::Exhaustive,
            parallel,
            ..CalibrationConfig::default()
        };
        let cal_start = Instant::now();
        let result = match CalibrationEngine::new(&products, config).run(
            &candidates,
            &movements,
            &reference,
        ) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("calibration failed: {e}");
                return;
            }
        };
        let cal_elapsed = cal_start.elapsed();
        println!(
            "Calibration parallel={:<5} candidates={} time={:.3}s status={:?} best={} precision={:.3}",
            parallel,
            result.evaluated(),
            cal_elapsed.as_secs_f64(),
            result.status,
            result.best.as_ref().map_or("-", |b| b.candidate_id.as_str()),
            result.overall_precision().unwrap_or(f64::NAN)
        );
        if result.status == CalibrationStatus::Exhausted {
            println!("  no candidate reached {:.1}%", result.threshold);
        }
    }
}

fn rule_set() -> RuleSetSpec {
    SIZES
        .iter()
        .fold(RuleSetSpec::new("synthetic"), |spec, (id, token, amount)| {
            spec.with_weight_rule(WeightRuleSpec::new(
                *id,
                PatternSpec::name_contains([*token]),
                *amount,
                MassUnit::Kilogram,
            ))
        })
}

fn generate_products(rng: &mut StdRng) -> ProductCatalog {
    (0..NUM_PRODUCTS)
        .map(|i| {
            // One product in twenty carries no size and stays unclassified.
            let name = if i % 20 == 19 {
                format!("SERVICIO {i}")
            } else {
                let (_, token, _) = SIZES[rng.gen_range(0..SIZES.len())];
                format!("AZUCAR LINEA {} {}", i % 7, token)
            };
            ProductDescriptor::new(format!("P{i:04}"), name)
        })
        .collect()
}

fn generate_movements(rng: &mut StdRng) -> Vec<Movement> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid start date");
    (0..NUM_MOVEMENTS)
        .map(|_| {
            let product = format!("P{:04}", rng.gen_range(0..NUM_PRODUCTS));
            let document_type = match rng.gen_range(0..100) {
                0..=84 => DocumentType::Sale,
                85..=92 => DocumentType::DeliveryNote,
                93..=97 => DocumentType::Return,
                _ => DocumentType::Cancellation,
            };
            let date = start + chrono::Duration::days(rng.gen_range(0..366));
            Movement::new(product, rng.gen_range(1.0..200.0), document_type, date)
        })
        .collect()
}
