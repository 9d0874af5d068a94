use crate::filter::Filter;
use crate::products::ProductCatalog;
use crate::types::Movement;

/// Drops movements whose recorded quantity is zero or negative.
///
/// With `keep_reversals` set, returns and cancellations pass whatever their
/// recorded sign, so netting sees every reversal.
pub struct PositiveQuantityFilter {
    pub keep_reversals: bool,
}

impl Filter<ProductCatalog, Movement> for PositiveQuantityFilter {
    fn keep(&self, _products: &ProductCatalog, movement: &Movement) -> bool {
        (self.keep_reversals && movement.document_type.is_reversal()) || movement.quantity > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentType;
    use chrono::NaiveDate;

    #[test]
    fn reversals_pass_only_when_exempted() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let movements = vec![
            Movement::new("P", -3.0, DocumentType::Sale, date),
            Movement::new("P", -20.0, DocumentType::Return, date),
            Movement::new("P", 0.0, DocumentType::Cancellation, date),
        ];
        let products = ProductCatalog::new();

        let strict = PositiveQuantityFilter { keep_reversals: false };
        assert!(strict.filter(&products, movements.iter().collect()).kept.is_empty());

        let netting = PositiveQuantityFilter { keep_reversals: true };
        let kept = netting.filter(&products, movements.iter().collect()).kept;
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|m| m.document_type.is_reversal()));
    }
}
