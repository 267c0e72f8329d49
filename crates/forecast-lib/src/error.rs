//! Error taxonomy for the forecast pipeline

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Long-running pipeline operations guarded against concurrent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    LoadCatalog,
    Train,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::LoadCatalog => write!(f, "catalog load"),
            Operation::Train => write!(f, "training"),
        }
    }
}

/// Errors surfaced by the pipeline to its callers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The catalog source failed. Recovered by the orchestrator with
    /// synthetic data, so callers of `load_catalog` never see it.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("no usable records to train on")]
    EmptyTrainingSet,

    #[error("training failed: {0}")]
    TrainingFailed(String),

    #[error("model not trained")]
    ModelNotTrained,

    /// The classifier is trained but yielded a non-numeric score
    #[error("prediction unavailable: {0}")]
    PredictionUnavailable(String),

    #[error("record {0} cannot be converted to features")]
    MalformedRecord(String),

    #[error("{0} already in progress")]
    AlreadyInProgress(Operation),

    #[error("invalid training config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
