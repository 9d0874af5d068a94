pub mod catalog;
pub mod classifier;
pub mod error;
pub mod normalize;
pub mod pattern;
pub mod product;
pub mod rule_set;
pub mod units;

pub use catalog::RuleCatalog;
pub use classifier::{Classification, Classifier};
pub use error::{RuleError, RuleResult};
pub use pattern::PatternSpec;
pub use product::ProductDescriptor;
pub use rule_set::{CategoryRuleSpec, FactorOverride, RuleSetSpec, WeightRuleSpec, DEFAULT_CATEGORY};
pub use units::{MassUnit, KG_PER_POUND};
