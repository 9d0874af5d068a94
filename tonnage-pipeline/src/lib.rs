pub mod aggregator;
pub mod calibration;
pub mod components;
pub mod error;
pub mod filter;
pub mod loader;
pub mod plan;
pub mod policy;
pub mod products;
pub mod reference;
pub mod selector;
pub mod sink;
pub mod source;
pub mod summation;
pub mod types;
pub mod util;

pub use aggregator::{aggregate, AggregationReport, Aggregator, DataQualityReport};
pub use calibration::{
    CalibrationConfig, CalibrationEngine, CalibrationResult, CalibrationStatus, CancelToken,
    Candidate, CandidateGrid, CandidateOutcome, FactorVariant, StoppingRule,
};
pub use error::{CalibrationError, CandidateFailure, LoadError, PipelineError, SinkError};
pub use loader::MovementBatch;
pub use plan::CalibrationPlan;
pub use policy::{ExclusionScope, FilterPolicy, Grouping, QuantitySign};
pub use products::ProductCatalog;
pub use reference::ReferenceTargetStore;
pub use types::{AggregationBucket, BucketKey, DateRange, DocumentType, Movement, Period, PeriodGranularity};
