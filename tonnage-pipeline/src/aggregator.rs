//! Movement stream to physical-quantity totals.
//!
//! One aggregation call:
//! 1. Validates the policy and builds its filter stages (product-level
//!    exclusions are precomputed here, before the main pass)
//! 2. Runs the stages in order, recording how many movements each removes
//! 3. Classifies every distinct product once (in parallel)
//! 4. Folds kept movements into buckets with compensated summation
//!
//! Unclassified products contribute zero mass and are listed in the
//! data-quality report. Nothing here mutates the input.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, info, warn};
use serde::Serialize;
use tonnage_rules::{Classification, Classifier};

use crate::components::agent_filter::AgentFilter;
use crate::components::date_range_filter::DateRangeFilter;
use crate::components::document_type_filter::DocumentTypeFilter;
use crate::components::positive_quantity_filter::PositiveQuantityFilter;
use crate::components::product_filter::ProductFilter;
use crate::components::product_level_exclusion_filter::ProductLevelExclusionFilter;
use crate::error::PipelineResult;
use crate::filter::Filter;
use crate::policy::{ExclusionScope, FilterPolicy, QuantitySign};
use crate::products::ProductCatalog;
use crate::summation::NeumaierSum;
use crate::types::{AggregationBucket, BucketKey, Movement, Period};

type Stage<'a> = Box<dyn Filter<ProductCatalog, Movement> + 'a>;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageStats {
    pub stage: String,
    pub removed: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AggregationStats {
    pub input_movements: usize,
    pub kept_movements: usize,
    pub stages: Vec<StageStats>,
    pub distinct_products: usize,
    pub classified_products: usize,
}

/// A product with no matching weight rule.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnclassifiedProduct {
    pub product_code: String,
    pub product_name: String,
    pub movement_count: usize,
    pub quantity: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DataQualityReport {
    /// Sorted by absolute quantity, largest first.
    pub unclassified: Vec<UnclassifiedProduct>,
    pub unclassified_movements: usize,
    pub unclassified_quantity: f64,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.unclassified.is_empty()
    }
}

/// Mass contributed by one product to one period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductContribution {
    pub period: Period,
    pub product_code: String,
    pub product_name: String,
    pub rule_id: String,
    pub quantity: f64,
    pub mass: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodTotal {
    pub period: Period,
    pub total_quantity: f64,
    pub total_mass: f64,
    pub total_tonnes: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregationReport {
    pub rule_set_id: String,
    pub policy: String,
    /// Ascending by key.
    pub buckets: Vec<AggregationBucket>,
    pub data_quality: DataQualityReport,
    pub stats: AggregationStats,
    /// Ascending by period, then product code.
    pub contributions: Vec<ProductContribution>,
}

impl AggregationReport {
    /// Totals per period with secondary dimensions folded away.
    pub fn period_totals(&self) -> Vec<PeriodTotal> {
        let mut folded: BTreeMap<Period, (NeumaierSum, NeumaierSum)> = BTreeMap::new();
        for bucket in &self.buckets {
            let (quantity, mass) = folded.entry(bucket.key.period).or_default();
            quantity.add(bucket.total_quantity);
            mass.add(bucket.total_mass);
        }
        folded
            .into_iter()
            .map(|(period, (quantity, mass))| PeriodTotal {
                period,
                total_quantity: quantity.total(),
                total_mass: mass.total(),
                total_tonnes: mass.total() / 1000.0,
            })
            .collect()
    }

    /// Total mass per period, for scoring.
    pub fn mass_by_period(&self) -> BTreeMap<Period, f64> {
        self.period_totals()
            .into_iter()
            .map(|t| (t.period, t.total_mass))
            .collect()
    }

    pub fn total_mass(&self) -> f64 {
        self.buckets.iter().map(|b| b.total_mass).collect::<NeumaierSum>().total()
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BucketAccumulator {
    quantity: NeumaierSum,
    mass: NeumaierSum,
    movements: usize,
    unclassified_movements: usize,
    unclassified_quantity: NeumaierSum,
}

#[derive(Default)]
struct ContributionAccumulator {
    quantity: NeumaierSum,
    mass: NeumaierSum,
}

#[derive(Default)]
struct UnclassifiedAccumulator {
    movements: usize,
    quantity: NeumaierSum,
}

/// Converts movements into grouped physical-quantity totals under one
/// classifier.
pub struct Aggregator<'a> {
    classifier: &'a Classifier,
    products: &'a ProductCatalog,
}

impl<'a> Aggregator<'a> {
    pub fn new(classifier: &'a Classifier, products: &'a ProductCatalog) -> Self {
        Self {
            classifier,
            products,
        }
    }

    /// Build the ordered filter stages for a policy.
    fn stages<'m>(&self, movements: &'m [Movement], policy: &'m FilterPolicy) -> Vec<Stage<'m>> {
        let mut stages: Vec<Stage<'m>> = Vec::new();

        // Precomputed over the whole input so it sees every trigger movement.
        if let ExclusionScope::ProductLevel { trigger_types } = &policy.exclusion {
            let filter = ProductLevelExclusionFilter::from_movements(movements, trigger_types);
            debug!(
                "policy={} product-level exclusion set size={}",
                policy.name,
                filter.excluded_products()
            );
            stages.push(Box::new(filter));
        }
        stages.push(Box::new(DocumentTypeFilter::new(
            policy.document_types.clone(),
            &policy.conditional_document_types,
        )));
        stages.push(Box::new(ProductFilter::new(
            &policy.excluded_products,
            policy.included_products.as_ref(),
            &policy.excluded_code_fragments,
        )));
        stages.push(Box::new(DateRangeFilter {
            range: policy.date_range,
        }));
        if let Some(agents) = &policy.agents {
            stages.push(Box::new(AgentFilter {
                allowed: agents.clone(),
            }));
        }
        if policy.positive_only {
            stages.push(Box::new(PositiveQuantityFilter {
                keep_reversals: policy.quantity_sign == QuantitySign::NetReturns,
            }));
        }
        stages
    }

    pub fn aggregate(
        &self,
        movements: &[Movement],
        policy: &FilterPolicy,
    ) -> PipelineResult<AggregationReport> {
        policy.validate()?;

        let mut stats = AggregationStats {
            input_movements: movements.len(),
            ..AggregationStats::default()
        };

        let mut kept: Vec<&Movement> = movements.iter().collect();
        for stage in self.stages(movements, policy) {
            if !stage.enable(self.products) {
                continue;
            }
            let result = stage.filter(self.products, kept);
            debug!(
                "policy={} stage={} kept={} removed={}",
                policy.name,
                stage.name(),
                result.kept.len(),
                result.removed.len()
            );
            stats.stages.push(StageStats {
                stage: stage.name().to_string(),
                removed: result.removed.len(),
            });
            kept = result.kept;
        }
        stats.kept_movements = kept.len();

        let classifications = self.classify_distinct(&kept);
        stats.distinct_products = classifications.len();
        stats.classified_products = classifications.values().filter(|c| c.is_classified()).count();

        let grouping = policy.grouping;
        let mut buckets: BTreeMap<BucketKey, BucketAccumulator> = BTreeMap::new();
        let mut contributions: BTreeMap<(Period, &str), (ContributionAccumulator, &str)> =
            BTreeMap::new();
        let mut unclassified: BTreeMap<&str, UnclassifiedAccumulator> = BTreeMap::new();

        for movement in &kept {
            let code = movement.product_code.as_str();
            let Some(classification) = classifications.get(code) else {
                continue;
            };
            let quantity = policy.quantity_sign.apply(movement);
            let period = movement.period(grouping.granularity);
            let key = BucketKey {
                period,
                agent: if grouping.by_agent {
                    movement.agent.clone()
                } else {
                    None
                },
                category: grouping
                    .by_category
                    .then(|| classification.category().to_string()),
            };

            let bucket = buckets.entry(key).or_default();
            bucket.quantity.add(quantity);
            bucket.movements += 1;

            match classification {
                Classification::Classified {
                    weight_factor,
                    rule_id,
                    ..
                } => {
                    let mass = quantity * weight_factor;
                    bucket.mass.add(mass);
                    let (contribution, _) = contributions
                        .entry((period, code))
                        .or_insert_with(|| (ContributionAccumulator::default(), rule_id.as_str()));
                    contribution.quantity.add(quantity);
                    contribution.mass.add(mass);
                }
                Classification::Unclassified { .. } => {
                    bucket.unclassified_movements += 1;
                    bucket.unclassified_quantity.add(quantity);
                    let entry = unclassified.entry(code).or_default();
                    entry.movements += 1;
                    entry.quantity.add(quantity);
                }
            }
        }

        let buckets: Vec<AggregationBucket> = buckets
            .into_iter()
            .map(|(key, acc)| AggregationBucket {
                key,
                total_quantity: acc.quantity.total(),
                total_mass: acc.mass.total(),
                movement_count: acc.movements,
                unclassified_movements: acc.unclassified_movements,
                unclassified_quantity: acc.unclassified_quantity.total(),
            })
            .collect();

        let contributions = contributions
            .into_iter()
            .map(|((period, code), (acc, rule_id))| ProductContribution {
                period,
                product_code: code.to_string(),
                product_name: self.products.name_of(code).to_string(),
                rule_id: rule_id.to_string(),
                quantity: acc.quantity.total(),
                mass: acc.mass.total(),
            })
            .collect();

        let data_quality = self.data_quality(unclassified);
        if !data_quality.is_clean() {
            warn!(
                "rule_set={} policy={} unclassified_products={} unclassified_movements={}",
                self.classifier.rule_set_id(),
                policy.name,
                data_quality.unclassified.len(),
                data_quality.unclassified_movements
            );
        }

        let report = AggregationReport {
            rule_set_id: self.classifier.rule_set_id().to_string(),
            policy: policy.name.clone(),
            buckets,
            data_quality,
            stats,
            contributions,
        };
        info!(
            "rule_set={} policy={} movements={} kept={} buckets={} total_mass_kg={:.3}",
            report.rule_set_id,
            report.policy,
            report.stats.input_movements,
            report.stats.kept_movements,
            report.buckets.len(),
            report.total_mass()
        );
        Ok(report)
    }

    fn classify_distinct(&self, kept: &[&Movement]) -> HashMap<String, Classification> {
        let codes: BTreeSet<&str> = kept.iter().map(|m| m.product_code.as_str()).collect();
        let descriptors: Vec<_> = codes.iter().map(|c| self.products.descriptor(c)).collect();
        let classifications = self.classifier.classify_batch(&descriptors);
        codes
            .into_iter()
            .map(str::to_string)
            .zip(classifications)
            .collect()
    }

    fn data_quality(&self, unclassified: BTreeMap<&str, UnclassifiedAccumulator>) -> DataQualityReport {
        let mut movements = 0;
        let mut quantity = NeumaierSum::new();
        let mut products: Vec<UnclassifiedProduct> = unclassified
            .into_iter()
            .map(|(code, acc)| {
                movements += acc.movements;
                quantity.merge(&acc.quantity);
                UnclassifiedProduct {
                    product_code: code.to_string(),
                    product_name: self.products.name_of(code).to_string(),
                    movement_count: acc.movements,
                    quantity: acc.quantity.total(),
                }
            })
            .collect();
        products.sort_by(|a, b| b.quantity.abs().total_cmp(&a.quantity.abs()));

        DataQualityReport {
            unclassified: products,
            unclassified_movements: movements,
            unclassified_quantity: quantity.total(),
        }
    }
}

/// Aggregate with a fresh `Aggregator`.
pub fn aggregate(
    movements: &[Movement],
    products: &ProductCatalog,
    classifier: &Classifier,
    policy: &FilterPolicy,
) -> PipelineResult<AggregationReport> {
    Aggregator::new(classifier, products).aggregate(movements, policy)
}
