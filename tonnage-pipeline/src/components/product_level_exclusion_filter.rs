use std::collections::{BTreeSet, HashSet};

use tonnage_rules::normalize::normalize_code;

use crate::filter::Filter;
use crate::products::ProductCatalog;
use crate::types::{DocumentType, Movement};

/// Drops every movement of a product that has at least one movement of a
/// trigger type anywhere in the input.
///
/// The excluded set is computed once, over the whole movement slice, before
/// any other stage runs. Codes are compared after normalization, as in
/// `ProductFilter`.
pub struct ProductLevelExclusionFilter {
    excluded: HashSet<String>,
}

impl ProductLevelExclusionFilter {
    pub fn from_movements(movements: &[Movement], triggers: &BTreeSet<DocumentType>) -> Self {
        let excluded = movements
            .iter()
            .filter(|m| triggers.contains(&m.document_type))
            .map(|m| normalize_code(&m.product_code))
            .collect();
        Self { excluded }
    }

    pub fn excluded_products(&self) -> usize {
        self.excluded.len()
    }
}

impl Filter<ProductCatalog, Movement> for ProductLevelExclusionFilter {
    fn keep(&self, _products: &ProductCatalog, movement: &Movement) -> bool {
        !self.excluded.contains(&normalize_code(&movement.product_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn returned_product_loses_all_movements() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let movements = vec![
            Movement::new("A", 100.0, DocumentType::Sale, date),
            Movement::new("A", 20.0, DocumentType::Return, date),
            Movement::new("B", 50.0, DocumentType::Sale, date),
        ];
        let filter = ProductLevelExclusionFilter::from_movements(
            &movements,
            &BTreeSet::from([DocumentType::Return]),
        );
        assert_eq!(filter.excluded_products(), 1);
        let result = filter.filter(&ProductCatalog::new(), movements.iter().collect());
        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.kept[0].product_code, "B");
        assert_eq!(result.removed.len(), 2);
    }

    #[test]
    fn codes_differing_in_case_are_one_product() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let movements = vec![
            Movement::new("PREP1", 5.0, DocumentType::Return, date),
            Movement::new("prep1", 100.0, DocumentType::Sale, date),
            Movement::new(" PREP1 ", 7.0, DocumentType::Sale, date),
        ];
        let filter = ProductLevelExclusionFilter::from_movements(
            &movements,
            &BTreeSet::from([DocumentType::Return]),
        );
        assert_eq!(filter.excluded_products(), 1);
        let result = filter.filter(&ProductCatalog::new(), movements.iter().collect());
        assert!(result.kept.is_empty());
        assert_eq!(result.removed.len(), 3);
    }
}
