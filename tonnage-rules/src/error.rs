//! Rule configuration error types.
//!
//! Every way a rule set can be malformed has a named variant. These are
//! configuration errors: they surface when a rule set is compiled, before
//! any movement is aggregated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Rule set id must not be empty")]
    EmptyRuleSetId,

    #[error("Rule id must not be empty (rule set '{rule_set}', position {position})")]
    EmptyRuleId { rule_set: String, position: usize },

    #[error("Duplicate rule id '{rule_id}' in rule set '{rule_set}'")]
    DuplicateRuleId { rule_set: String, rule_id: String },

    #[error("Invalid weight for rule '{rule_id}': {reason}")]
    InvalidWeight { rule_id: String, reason: String },

    #[error("Invalid pattern for rule '{rule_id}': {reason}")]
    InvalidPattern { rule_id: String, reason: String },

    #[error("Unknown rule set: {0}")]
    UnknownRuleSet(String),

    #[error("Duplicate rule set id: {0}")]
    DuplicateRuleSet(String),

    #[error("Cyclic precedence between rule sets: {}", .0.join(" -> "))]
    CyclicPrecedence(Vec<String>),

    #[error("Override targets unknown rule '{rule_id}' in rule set '{rule_set}'")]
    UnknownOverrideTarget { rule_set: String, rule_id: String },

    #[error("Catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type alias for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;
