//! Filter policy: which movements count, how their sign is read, and how
//! results are grouped.
//!
//! A policy is plain configuration. The aggregator turns it into an ordered
//! list of filter stages (see `components`).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DateRange, DocumentType, Movement, PeriodGranularity};

/// Which movements a disallowed document type removes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ExclusionScope {
    /// Only movements whose own type is not included are dropped.
    #[default]
    MovementLevel,
    /// Every movement of a product is dropped if any movement of that
    /// product has one of the trigger types.
    ProductLevel { trigger_types: BTreeSet<DocumentType> },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantitySign {
    /// Use the quantity exactly as recorded.
    #[default]
    AsRecorded,
    /// Returns and cancellations subtract `|quantity|`.
    NetReturns,
}

impl QuantitySign {
    pub fn apply(self, movement: &Movement) -> f64 {
        match self {
            QuantitySign::AsRecorded => movement.quantity,
            QuantitySign::NetReturns if movement.document_type.is_reversal() => {
                -movement.quantity.abs()
            }
            QuantitySign::NetReturns => movement.quantity,
        }
    }
}

/// A document type included only for products whose name contains one of
/// the tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalInclusion {
    pub document_type: DocumentType,
    pub name_contains: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grouping {
    pub granularity: PeriodGranularity,
    pub by_agent: bool,
    pub by_category: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    pub name: String,
    pub document_types: BTreeSet<DocumentType>,
    pub conditional_document_types: Vec<ConditionalInclusion>,
    pub exclusion: ExclusionScope,
    pub quantity_sign: QuantitySign,
    pub excluded_products: BTreeSet<String>,
    /// When set, only these product codes are considered.
    pub included_products: Option<BTreeSet<String>>,
    /// Products whose code contains any fragment are dropped.
    pub excluded_code_fragments: Vec<String>,
    pub date_range: DateRange,
    /// When set, only movements recorded by these agents are kept.
    pub agents: Option<BTreeSet<String>>,
    /// Drop movements whose recorded quantity is not strictly positive.
    /// Under `NetReturns`, returns and cancellations are kept whatever
    /// their recorded sign.
    pub positive_only: bool,
    pub grouping: Grouping,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::sales_only()
    }
}

impl FilterPolicy {
    /// Sales only, movement-level exclusion, monthly buckets.
    pub fn sales_only() -> Self {
        Self {
            name: "sales-only".to_string(),
            document_types: BTreeSet::from([DocumentType::Sale]),
            conditional_document_types: Vec::new(),
            exclusion: ExclusionScope::MovementLevel,
            quantity_sign: QuantitySign::AsRecorded,
            excluded_products: BTreeSet::new(),
            included_products: None,
            excluded_code_fragments: Vec::new(),
            date_range: DateRange::default(),
            agents: None,
            positive_only: false,
            grouping: Grouping::default(),
        }
    }

    /// Sales with returns and cancellations netted against them.
    pub fn netted_sales() -> Self {
        Self {
            name: "netted-sales".to_string(),
            document_types: BTreeSet::from([
                DocumentType::Sale,
                DocumentType::Return,
                DocumentType::Cancellation,
            ]),
            quantity_sign: QuantitySign::NetReturns,
            ..Self::sales_only()
        }
    }

    /// Sales of products that were never returned.
    pub fn never_returned_sales() -> Self {
        Self {
            name: "never-returned-sales".to_string(),
            exclusion: ExclusionScope::ProductLevel {
                trigger_types: BTreeSet::from([DocumentType::Return]),
            },
            ..Self::sales_only()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let invalid = |reason: &str| PipelineError::InvalidPolicy {
            policy: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.document_types.is_empty() && self.conditional_document_types.is_empty() {
            return Err(invalid("no document type is included"));
        }
        if let ExclusionScope::ProductLevel { trigger_types } = &self.exclusion {
            if trigger_types.is_empty() {
                return Err(invalid("product-level exclusion needs at least one trigger type"));
            }
        }
        for conditional in &self.conditional_document_types {
            if conditional.name_contains.iter().all(|t| t.trim().is_empty()) {
                return Err(invalid("conditional inclusion has no name tokens"));
            }
        }
        if self.excluded_code_fragments.iter().any(|f| f.trim().is_empty()) {
            return Err(invalid("excluded code fragment is blank"));
        }
        if let (Some(start), Some(end)) = (self.date_range.start, self.date_range.end) {
            if start > end {
                return Err(invalid("date range starts after it ends"));
            }
        }
        Ok(())
    }
}
