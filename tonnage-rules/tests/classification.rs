//! Classification behavior tests for tonnage-rules.
//!
//! Validates that:
//! 1. Spacing and unit-alias variants of the same packaging classify alike
//! 2. Earlier rules shadow later ones (first match wins)
//! 3. Reordering rules whose patterns never overlap changes nothing
//! 4. Classification is deterministic across repeated and batched calls

use proptest::prelude::*;
use tonnage_rules::{
    CategoryRuleSpec, Classification, Classifier, MassUnit, PatternSpec, ProductDescriptor,
    RuleCatalog, RuleSetSpec, WeightRuleSpec,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn weight(id: &str, tokens: &[&str], amount: f64, unit: MassUnit) -> WeightRuleSpec {
    WeightRuleSpec::new(id, PatternSpec::name_contains(tokens.iter().copied()), amount, unit)
}

/// A rule set shaped like the production sugar list.
fn production_like() -> RuleSetSpec {
    RuleSetSpec::new("production")
        .with_weight_rule(WeightRuleSpec::new(
            "mregr-25",
            PatternSpec::All(vec![
                PatternSpec::CodePrefix("MREGR".into()),
                PatternSpec::name_contains(["25 KG"]),
            ]),
            25.0,
            MassUnit::Kilogram,
        ))
        .with_weight_rule(weight("sack-25", &["25 KG", "SACO 25"], 25.0, MassUnit::Kilogram))
        .with_weight_rule(weight("sack-50lb", &["50 LB"], 50.0, MassUnit::Pound))
        .with_weight_rule(weight("bag-907", &["907 GR", "2 LB"], 0.907, MassUnit::Kilogram))
        .with_weight_rule(weight("bag-500", &["500 GR", "0.5 KG"], 0.5, MassUnit::Kilogram))
        .with_weight_rule(weight("bag-1", &["1 KG"], 1.0, MassUnit::Kilogram))
        .with_weight_rule(weight("super-sack", &["1000 KG", "1 TON"], 1.0, MassUnit::Tonne))
        .with_category_rule(CategoryRuleSpec::new(
            "glucosa",
            PatternSpec::name_contains(["GLUCOSA"]),
            "Glucosa",
        ))
        .with_category_rule(CategoryRuleSpec::new(
            "pulver",
            PatternSpec::name_contains(["PULVER"]),
            "Pulverizada",
        ))
        .with_category_rule(CategoryRuleSpec::new(
            "estandar",
            PatternSpec::CodeContains("PESGR".into()),
            "Estandar Granulada",
        ))
}

fn factor(classifier: &Classifier, code: &str, name: &str) -> Option<f64> {
    classifier
        .classify(&ProductDescriptor::new(code, name))
        .weight_factor()
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[test]
fn spacing_and_alias_variants_are_equivalent() {
    let classifier = Classifier::new(&production_like()).unwrap();
    for name in [
        "AZUCAR ESTANDAR 25 KG",
        "AZUCAR ESTANDAR 25KG",
        "azucar estandar 25 kgs",
        "Azúcar Estándar 25  Kilos",
        "AZUCAR ESTANDAR SACO 25",
    ] {
        assert_eq!(factor(&classifier, "PESGR01", name), Some(25.0), "{name}");
    }
}

#[test]
fn small_bags_do_not_match_inside_larger_numbers() {
    let classifier = Classifier::new(&production_like()).unwrap();
    assert_eq!(factor(&classifier, "A", "REFINADA 1 KG"), Some(1.0));
    // "1 KG" must not fire inside "1000 KG".
    assert_eq!(factor(&classifier, "A", "REFINADA 1000 KG"), Some(1000.0));
    // "0.5 KG" must not fire inside "10.5 KG"; nothing else matches.
    assert_eq!(factor(&classifier, "A", "REFINADA 10.5 KG"), None);
}

#[test]
fn categories_are_independent_of_weight() {
    let classifier = Classifier::new(&production_like()).unwrap();
    let c = classifier.classify(&ProductDescriptor::new("X9", "GLUCOSA GRANEL"));
    assert!(!c.is_classified());
    assert_eq!(c.category(), "Glucosa");

    let c = classifier.classify(&ProductDescriptor::new("PESGR7", "AZUCAR PULVERIZADA 500 GR"));
    assert_eq!(c.weight_factor(), Some(0.5));
    assert_eq!(c.category(), "Pulverizada");
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn first_match_wins() {
    let shadowing = RuleSetSpec::new("shadow")
        .with_weight_rule(weight("broad", &["AZUCAR"], 1.0, MassUnit::Kilogram))
        .with_weight_rule(weight("narrow", &["25 KG"], 25.0, MassUnit::Kilogram));
    let classifier = Classifier::new(&shadowing).unwrap();
    let c = classifier.classify(&ProductDescriptor::new("A", "AZUCAR 25 KG"));
    assert_eq!(c.rule_id(), Some("broad"));
}

fn disjoint_rules() -> Vec<WeightRuleSpec> {
    (0..8)
        .map(|i| {
            WeightRuleSpec::new(
                format!("rule-{i}"),
                PatternSpec::CodeEquals(format!("CODE{i}")),
                (i + 1) as f64 * 5.0,
                MassUnit::Kilogram,
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn reordering_non_overlapping_rules_is_invisible(
        order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let rules = disjoint_rules();
        let mut original = RuleSetSpec::new("original");
        original.weight_rules = rules.clone();
        let mut shuffled = RuleSetSpec::new("shuffled");
        shuffled.weight_rules = order.iter().map(|&i| rules[i].clone()).collect();

        let a = Classifier::new(&original).unwrap();
        let b = Classifier::new(&shuffled).unwrap();
        for i in 0..10 {
            let product = ProductDescriptor::new(format!("CODE{i}"), "ANY NAME");
            prop_assert_eq!(a.classify(&product), b.classify(&product));
        }
    }

    #[test]
    fn classification_is_deterministic(name in "[A-Z ]{0,12}( [0-9]{1,4} ?(KG|LB|GR))?") {
        let classifier = Classifier::new(&production_like()).unwrap();
        let product = ProductDescriptor::new("P1", name);
        let first = classifier.classify(&product);
        let second = classifier.classify(&product);
        prop_assert_eq!(&first, &second);
        let batch = classifier.classify_batch(std::slice::from_ref(&product));
        prop_assert_eq!(&batch[0], &first);
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[test]
fn derived_rule_set_from_catalog_changes_only_overridden_factor() {
    let catalog = RuleCatalog::new(vec![production_like()], None).unwrap();
    let base = catalog.resolve("production").unwrap();
    let heavy = base
        .with_overrides(
            "production-heavy",
            &[tonnage_rules::FactorOverride::new("sack-25", 25.2)],
        )
        .unwrap();

    let base_classifier = Classifier::new(&base).unwrap();
    let heavy_classifier = Classifier::new(&heavy).unwrap();
    assert_eq!(heavy_classifier.rule_set_id(), "production-heavy");
    assert_eq!(factor(&heavy_classifier, "A", "AZUCAR 25 KG"), Some(25.2));
    assert_eq!(
        factor(&heavy_classifier, "A", "REFINADA 1 KG"),
        factor(&base_classifier, "A", "REFINADA 1 KG")
    );
    assert!(matches!(
        base_classifier.classify(&ProductDescriptor::new("", "")),
        Classification::Unclassified { .. }
    ));
}
