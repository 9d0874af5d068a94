use crate::filter::Filter;
use crate::products::ProductCatalog;
use crate::types::{DateRange, Movement};

/// Keeps movements dated inside an inclusive range.
pub struct DateRangeFilter {
    pub range: DateRange,
}

impl Filter<ProductCatalog, Movement> for DateRangeFilter {
    fn enable(&self, _products: &ProductCatalog) -> bool {
        self.range.start.is_some() || self.range.end.is_some()
    }

    fn keep(&self, _products: &ProductCatalog, movement: &Movement) -> bool {
        self.range.contains(movement.date)
    }
}
