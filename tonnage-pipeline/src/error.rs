//! Error types for loading, aggregation and calibration.
//!
//! Data-quality defects (unclassified products) and reference gaps are not
//! errors; they travel as values inside reports.

use thiserror::Error;
use tonnage_rules::RuleError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid filter policy '{policy}': {reason}")]
    InvalidPolicy { policy: String, reason: String },

    #[error(transparent)]
    Rules(#[from] RuleError),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("Invalid value at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid reference target: {0}")]
    Reference(#[from] ReferenceError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ReferenceError {
    #[error("Expected total for {period} is not finite")]
    NonFinite { period: String },

    #[error("Expected total for {period} is negative ({value})")]
    Negative { period: String, value: f64 },

    #[error("Duplicate reference period {0}")]
    DuplicatePeriod(String),
}

/// Fatal, run-level calibration failures. A single bad candidate is not
/// one of these; it is disqualified and the run continues.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Threshold must be a finite percentage in [0, 100], got {0}")]
    InvalidThreshold(f64),

    #[error("No candidates to evaluate")]
    NoCandidates,

    #[error("Duplicate candidate id '{0}'")]
    DuplicateCandidate(String),

    #[error("Reference target store is empty")]
    EmptyReference,

    #[error("Candidate grid is invalid: {0}")]
    InvalidGrid(String),

    #[error(transparent)]
    Rules(#[from] RuleError),
}

/// Why one candidate could not be scored.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CandidateFailure {
    #[error("rule set failed to compile: {0}")]
    RuleSet(String),

    #[error("policy is invalid: {0}")]
    Policy(String),

    #[error("no period is present in both computed totals and reference targets")]
    NoComparablePeriods,

    #[error("expected total over compared periods is zero")]
    ZeroExpectedTotal,

    #[error("computed totals are not finite")]
    NonFiniteTotal,

    #[error("reference periods without computed totals: {0}")]
    IncompleteCoverage(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
pub type LoadResult<T> = Result<T, LoadError>;
