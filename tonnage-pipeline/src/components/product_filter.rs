use std::collections::BTreeSet;

use tonnage_rules::normalize::normalize_code;

use crate::filter::Filter;
use crate::products::ProductCatalog;
use crate::types::Movement;

/// Applies the product inclusion list, exclusion list and excluded code
/// fragments. Codes are compared after normalization.
pub struct ProductFilter {
    excluded: BTreeSet<String>,
    included: Option<BTreeSet<String>>,
    fragments: Vec<String>,
}

impl ProductFilter {
    pub fn new(
        excluded: &BTreeSet<String>,
        included: Option<&BTreeSet<String>>,
        fragments: &[String],
    ) -> Self {
        Self {
            excluded: excluded.iter().map(|c| normalize_code(c)).collect(),
            included: included.map(|set| set.iter().map(|c| normalize_code(c)).collect()),
            fragments: fragments.iter().map(|f| normalize_code(f)).collect(),
        }
    }

    /// No product constraint configured.
    pub fn is_noop(&self) -> bool {
        self.excluded.is_empty() && self.included.is_none() && self.fragments.is_empty()
    }
}

impl Filter<ProductCatalog, Movement> for ProductFilter {
    fn enable(&self, _products: &ProductCatalog) -> bool {
        !self.is_noop()
    }

    fn keep(&self, _products: &ProductCatalog, movement: &Movement) -> bool {
        let code = normalize_code(&movement.product_code);
        if self.excluded.contains(&code) {
            return false;
        }
        if let Some(included) = &self.included {
            if !included.contains(&code) {
                return false;
            }
        }
        !self.fragments.iter().any(|f| code.contains(f.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentType;
    use chrono::NaiveDate;

    fn movement(code: &str) -> Movement {
        Movement::new(code, 1.0, DocumentType::Sale, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
    }

    #[test]
    fn fragments_exclusions_and_inclusions() {
        let filter = ProductFilter::new(
            &BTreeSet::from(["PREP9".to_string()]),
            Some(&BTreeSet::from([
                "PREP1".to_string(),
                "PREP9".to_string(),
                "RSERMAQ01".to_string(),
            ])),
            &["rsermaq".to_string()],
        );
        let products = ProductCatalog::new();
        assert!(filter.keep(&products, &movement("prep1")));
        assert!(!filter.keep(&products, &movement("PREP9")));
        assert!(!filter.keep(&products, &movement("RSERMAQ01")));
        assert!(!filter.keep(&products, &movement("PREP2")));
    }

    #[test]
    fn empty_configuration_is_disabled() {
        let filter = ProductFilter::new(&BTreeSet::new(), None, &[]);
        assert!(!filter.enable(&ProductCatalog::new()));
    }
}
