pub mod artifacts;
pub mod config;
pub mod domain;
pub mod errors;
pub mod spending;

pub use artifacts::{ArtifactError, ArtifactKind, ArtifactStore};
pub use domain::billing::{BillingRecord, BILLING_RECORD_COUNT};
pub use domain::profile::{ProjectProfile, REQUIRED_PROFILE_FIELDS};
pub use domain::report::OptimizationReport;
pub use domain::shape::JsonShape;
pub use errors::{
    AggregationError, AttemptError, ExtractionError, PipelineError, PipelineStage, StageError,
};
pub use spending::SpendingSummary;
