use std::cmp::Ordering;

use crate::util;

/// High scores first; NaN after every number.
pub fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    }
}

/// Ranks scored items and keeps the best of them.
pub trait Selector<C>: Send + Sync {
    fn score(&self, item: &C) -> f64;

    /// Maximum number of items kept by `select`. `None` keeps everything.
    fn limit(&self) -> Option<usize> {
        None
    }

    /// Stable ranking by `score`: equal scores keep their input order.
    fn rank(&self, mut items: Vec<C>) -> Vec<C> {
        items.sort_by(|a, b| descending_nan_last(self.score(a), self.score(b)));
        items
    }

    fn select(&self, items: Vec<C>) -> Vec<C> {
        let mut ranked = self.rank(items);
        if let Some(limit) = self.limit() {
            ranked.truncate(limit);
        }
        ranked
    }

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}
