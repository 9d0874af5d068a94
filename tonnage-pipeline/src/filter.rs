use crate::util;

/// Result of a filter operation, partitioning candidates into kept and removed.
pub struct FilterResult<C> {
    pub kept: Vec<C>,
    pub removed: Vec<C>,
}

/// Filters run sequentially and partition candidates into kept and removed sets.
///
/// Candidates are borrowed; a stage never copies or mutates a movement.
pub trait Filter<Q, C>: Send + Sync {
    /// Decide if this filter should run for the given query.
    fn enable(&self, _query: &Q) -> bool {
        true
    }

    /// Whether a single candidate continues to the next stage.
    fn keep(&self, query: &Q, candidate: &C) -> bool;

    /// Partition candidates. Relative order is preserved in both halves.
    fn filter<'c>(&self, query: &Q, candidates: Vec<&'c C>) -> FilterResult<&'c C> {
        let (kept, removed): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|candidate| self.keep(query, candidate));
        FilterResult { kept, removed }
    }

    /// Returns a stable name for logging and stage statistics.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}
