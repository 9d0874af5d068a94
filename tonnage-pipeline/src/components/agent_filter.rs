use std::collections::BTreeSet;

use crate::filter::Filter;
use crate::products::ProductCatalog;
use crate::types::Movement;

/// Keeps movements recorded by an allowed agent. Movements without an
/// agent never pass an allow-list.
pub struct AgentFilter {
    pub allowed: BTreeSet<String>,
}

impl Filter<ProductCatalog, Movement> for AgentFilter {
    fn keep(&self, _products: &ProductCatalog, movement: &Movement) -> bool {
        movement
            .agent
            .as_ref()
            .is_some_and(|agent| self.allowed.contains(agent))
    }
}
