//! Human-readable tables for the terminal.

use tonnage_pipeline::calibration::{CalibrationStatus, CandidateOutcome};
use tonnage_pipeline::{AggregationReport, CalibrationResult, MovementBatch};
use tonnage_rules::{Classification, ProductDescriptor};

const RULE_WIDTH: usize = 72;

fn banner(title: &str) {
    println!();
    println!("  ╔{}╗", "═".repeat(RULE_WIDTH - 2));
    println!("  ║{:^width$}║", title, width = RULE_WIDTH - 2);
    println!("  ╚{}╝", "═".repeat(RULE_WIDTH - 2));
    println!();
}

fn rule() {
    println!("  {}", "─".repeat(RULE_WIDTH));
}

/// Whole kilograms with thousands separators.
pub fn format_kg(amount: f64) -> String {
    let whole = amount.abs().round() as u64;
    let sign = if amount < 0.0 && whole > 0 { "-" } else { "" };

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

pub fn print_classifications(
    rule_set_id: &str,
    rows: &[(&ProductDescriptor, Classification)],
    total_products: usize,
) {
    banner(&format!("TONNAGE · Product classification · {rule_set_id}"));

    let unclassified = rows.iter().filter(|(_, c)| !c.is_classified()).count();
    println!(
        "  {} products shown of {}  ·  {} unclassified",
        rows.len(),
        total_products,
        unclassified
    );
    println!();
    rule();
    println!(
        "  {:<12} {:<30} {:>9}  {:<10} {}",
        "CODE", "NAME", "KG/UNIT", "CATEGORY", "RULE"
    );
    rule();
    for (product, classification) in rows {
        let factor = classification
            .weight_factor()
            .map_or_else(|| "?".to_string(), |f| format!("{f:.3}"));
        println!(
            "  {:<12} {:<30} {:>9}  {:<10} {}",
            truncate(&product.code, 12),
            truncate(&product.name, 30),
            factor,
            truncate(classification.category(), 10),
            classification.rule_id().unwrap_or("-")
        );
    }
    rule();
    println!();
}

// ---------------------------------------------------------------------------
// aggregate
// ---------------------------------------------------------------------------

pub fn print_aggregation(report: &AggregationReport, batch: &MovementBatch, elapsed_ms: u128) {
    banner(&format!(
        "TONNAGE · Aggregation · {} · {}",
        report.rule_set_id, report.policy
    ));

    println!(
        "  {} movements read  ·  {} kept  ·  {} products ({} classified)",
        batch.movements.len(),
        report.stats.kept_movements,
        report.stats.distinct_products,
        report.stats.classified_products
    );
    let removed: Vec<String> = report
        .stats
        .stages
        .iter()
        .filter(|s| s.removed > 0)
        .map(|s| format!("{} -{}", s.stage, s.removed))
        .collect();
    if !removed.is_empty() {
        println!("  filters: {}", removed.join("  ·  "));
    }
    println!();

    rule();
    println!(
        "  {:<12} {:>16} {:>18} {:>14}",
        "PERIOD", "UNITS", "MASS (KG)", "TONNES"
    );
    rule();
    for total in report.period_totals() {
        println!(
            "  {:<12} {:>16} {:>18} {:>14.3}",
            total.period.to_string(),
            format_kg(total.total_quantity),
            format_kg(total.total_mass),
            total.total_tonnes
        );
    }
    rule();
    println!(
        "  {:<12} {:>16} {:>18} {:>14.3}",
        "TOTAL",
        "",
        format_kg(report.total_mass()),
        report.total_mass() / 1000.0
    );

    let grouped = report
        .buckets
        .iter()
        .any(|b| b.key.agent.is_some() || b.key.category.is_some());
    if grouped {
        println!();
        println!("  {:<12} {:<16} {:<12} {:>18}", "PERIOD", "AGENT", "CATEGORY", "MASS (KG)");
        rule();
        for bucket in &report.buckets {
            println!(
                "  {:<12} {:<16} {:<12} {:>18}",
                bucket.key.period.to_string(),
                truncate(bucket.key.agent.as_deref().unwrap_or("-"), 16),
                truncate(bucket.key.category.as_deref().unwrap_or("-"), 12),
                format_kg(bucket.total_mass)
            );
        }
        rule();
    }

    print_unclassified(report);
    println!();
    println!("  ⏱  Aggregated in {elapsed_ms}ms");
    println!();
}

fn print_unclassified(report: &AggregationReport) {
    let quality = &report.data_quality;
    if quality.is_clean() {
        return;
    }
    println!();
    println!(
        "  ! {} unclassified products ({} movements, {} units) contribute no mass:",
        quality.unclassified.len(),
        quality.unclassified_movements,
        format_kg(quality.unclassified_quantity)
    );
    for product in quality.unclassified.iter().take(10) {
        println!(
            "      {:<12} {:<34} {:>10} units",
            truncate(&product.product_code, 12),
            truncate(&product.product_name, 34),
            format_kg(product.quantity)
        );
    }
    if quality.unclassified.len() > 10 {
        println!("      … +{} more", quality.unclassified.len() - 10);
    }
}

// ---------------------------------------------------------------------------
// calibrate
// ---------------------------------------------------------------------------

pub fn print_calibration(result: &CalibrationResult, top: usize, elapsed_ms: u128) {
    banner("TONNAGE · Calibration");

    let verdict = match result.status {
        CalibrationStatus::Accepted => "ACCEPTED",
        CalibrationStatus::Exhausted => "THRESHOLD NOT MET",
        CalibrationStatus::Cancelled => "CANCELLED",
    };
    println!(
        "  {}  ·  threshold {:.2}%  ·  {} of {} candidates evaluated ({:?})",
        verdict,
        result.threshold,
        result.evaluated(),
        result.total_candidates,
        result.stopping
    );
    println!();

    let Some(best) = &result.best else {
        println!("  No candidate could be scored.");
        print_ranking(result, top);
        println!();
        return;
    };

    println!("  best      {}", best.candidate_id);
    println!("  rule set  {}", best.rule_set_id);
    println!("  policy    {}", best.policy);
    println!("  precision {:.3}%", best.overall_precision);
    println!();

    rule();
    println!(
        "  {:<12} {:>16} {:>16} {:>14} {:>9}",
        "PERIOD", "COMPUTED (KG)", "EXPECTED (KG)", "ERROR (KG)", "ERROR %"
    );
    rule();
    for period in &best.periods {
        println!(
            "  {:<12} {:>16} {:>16} {:>14} {:>9}",
            period.period.to_string(),
            format_kg(period.computed),
            format_kg(period.expected),
            format_kg(period.absolute_error),
            period
                .relative_error_pct
                .map_or_else(|| "-".to_string(), |p| format!("{p:.2}"))
        );
    }
    rule();

    if !best.reference_gaps.is_empty() {
        let gaps: Vec<String> = best.reference_gaps.iter().map(|p| p.to_string()).collect();
        println!("  no target for: {}", gaps.join(", "));
    }
    if !best.missing_periods.is_empty() {
        let missing: Vec<String> = best.missing_periods.iter().map(|p| p.to_string()).collect();
        println!("  nothing computed for: {}", missing.join(", "));
    }

    let worst = best.periods.iter().max_by(|a, b| {
        a.absolute_error
            .partial_cmp(&b.absolute_error)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(worst) = worst {
        if let Some(contributors) = best.top_contributors.iter().find(|c| c.period == worst.period) {
            println!();
            println!("  Largest contributors in {} (worst period):", worst.period);
            for c in &contributors.contributors {
                println!(
                    "      {:<12} {:<30} {:>14} kg  via {}",
                    truncate(&c.product_code, 12),
                    truncate(&c.product_name, 30),
                    format_kg(c.mass),
                    c.rule_id
                );
            }
        }
    }

    print_ranking(result, top);
    println!();
    println!("  ⏱  Calibrated in {elapsed_ms}ms");
    println!();
}

fn print_ranking(result: &CalibrationResult, top: usize) {
    if result.outcomes.len() < 2 || top == 0 {
        return;
    }
    println!();
    println!("  Ranking:");
    for (rank, outcome) in result.top_ranked(top).iter().enumerate() {
        match outcome {
            CandidateOutcome::Scored(score) => println!(
                "    {:>2}. {:<48} {:>8.3}%{}",
                rank + 1,
                truncate(&score.candidate_id, 48),
                score.overall_precision,
                if score.meets_threshold { "  ✓" } else { "" }
            ),
            CandidateOutcome::Disqualified {
                candidate_id,
                reason,
                ..
            } => println!(
                "    {:>2}. {:<48} disqualified: {}",
                rank + 1,
                truncate(candidate_id, 48),
                reason
            ),
        }
    }
    if result.outcomes.len() > top {
        println!("        … +{} more", result.outcomes.len() - top);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kilograms_are_grouped_by_thousands() {
        assert_eq!(format_kg(0.0), "0");
        assert_eq!(format_kg(999.4), "999");
        assert_eq!(format_kg(1000.0), "1,000");
        assert_eq!(format_kg(30_171_996.0), "30,171,996");
        assert_eq!(format_kg(-2500.0), "-2,500");
        assert_eq!(format_kg(-0.2), "0");
    }

    #[test]
    fn long_names_are_cut_with_an_ellipsis() {
        assert_eq!(truncate("AZUCAR", 10), "AZUCAR");
        assert_eq!(truncate("AZUCAR ESTANDAR 25 KG", 10), "AZUCAR ES…");
    }
}
