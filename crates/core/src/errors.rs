use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::shape::JsonShape;

/// Why a single request/validate cycle failed. Always retried by the structured client.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed output: {reason}")]
    MalformedOutput { reason: String },
    #[error("expected a JSON {expected}, received a JSON {found}")]
    KindMismatch { expected: JsonShape, found: &'static str },
}

impl AttemptError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOutput { reason: reason.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::KindMismatch { .. } => "kind_mismatch",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error(
        "no viable structured response obtained after {attempts} attempt(s){}",
        describe_last_failure(.last_failure)
    )]
    ExhaustedRetries { attempts: u32, last_failure: Option<AttemptError> },
}

fn describe_last_failure(last_failure: &Option<AttemptError>) -> String {
    last_failure.as_ref().map(|failure| format!(" (last: {failure})")).unwrap_or_default()
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("billing record {index} has no service")]
    MissingService { index: usize },
    #[error("billing record {index} has a non-finite cost")]
    NonFiniteCost { index: usize },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("schema violation in {entity}: {detail}")]
    SchemaViolation { entity: &'static str, detail: String },
    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl StageError {
    pub fn schema(entity: &'static str, detail: impl Into<String>) -> Self {
        Self::SchemaViolation { entity, detail: detail.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::SchemaViolation { .. } => "schema_violation",
            Self::Aggregation(_) => "aggregation",
            Self::Extraction(ExtractionError::ExhaustedRetries { .. }) => "exhausted_retries",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    ProfileExtraction,
    BillingSynthesis,
    ReportGeneration,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileExtraction => "profile_extraction",
            Self::BillingSynthesis => "billing_synthesis",
            Self::ReportGeneration => "report_generation",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: StageError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: impl Into<StageError>) -> Self {
        Self { stage, source: source.into() }
    }

    pub fn error_class(&self) -> &'static str {
        self.source.error_class()
    }
}
