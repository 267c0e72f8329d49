//! Pipeline state and its serialisable views

use crate::models::InventoryRecord;
use crate::predictor::{Classifier, ClassifierSummary};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MSG_LOADING: &str = "Loading products...";
pub const MSG_TRAINING: &str = "Training model, please wait...";
pub const MSG_TRAINED: &str = "Model trained!";
pub const MSG_NO_RECORDS: &str = "No products to train on. Load products first.";

/// Where the pipeline is in its load → train → predict sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStatus {
    #[default]
    Idle,
    LoadingCatalog,
    CatalogLoaded,
    Training,
    Ready,
    Error,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Idle => "idle",
            PipelineStatus::LoadingCatalog => "loadingCatalog",
            PipelineStatus::CatalogLoaded => "catalogLoaded",
            PipelineStatus::Training => "training",
            PipelineStatus::Ready => "ready",
            PipelineStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// The single mutable record owned by the orchestrator.
///
/// `classifier` is left alone when the catalog is reloaded, so
/// after a reload it may have been trained on records that are no longer
/// loaded. Callers retrain to pick up the new catalog.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub records: Vec<InventoryRecord>,
    pub classifier: Option<Classifier>,
    pub status: PipelineStatus,
    pub message: String,
    /// True while `records` came from the synthetic fallback
    pub degraded: bool,
}

impl PipelineState {
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            status: self.status,
            message: self.message.clone(),
            degraded: self.degraded,
            record_count: self.records.len(),
            records: self.records.clone(),
            classifier: self.classifier.as_ref().map(Classifier::summary),
        }
    }
}

/// Point-in-time copy of the pipeline state for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub status: PipelineStatus,
    pub message: String,
    pub degraded: bool,
    pub record_count: usize,
    pub records: Vec<InventoryRecord>,
    pub classifier: Option<ClassifierSummary>,
}

/// Result of a catalog load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Records came from the catalog source
    Live { count: usize },
    /// The source failed and synthetic records were substituted
    Degraded { count: usize, cause: String },
}

impl LoadOutcome {
    pub fn count(&self) -> usize {
        match self {
            LoadOutcome::Live { count } | LoadOutcome::Degraded { count, .. } => *count,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, LoadOutcome::Degraded { .. })
    }

    /// Status message shown to the operator
    pub fn message(&self) -> String {
        match self {
            LoadOutcome::Live { count } => format!("Loaded {} products.", count),
            LoadOutcome::Degraded { count, cause } => format!(
                "Catalog unavailable ({}); using {} synthetic products (degraded mode).",
                cause, count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PipelineStatus::CatalogLoaded).unwrap(),
            "\"catalogLoaded\""
        );
        assert_eq!(
            serde_json::to_string(&PipelineStatus::LoadingCatalog).unwrap(),
            "\"loadingCatalog\""
        );
        assert_eq!(PipelineStatus::Ready.to_string(), "ready");
    }

    #[test]
    fn test_initial_state() {
        let snapshot = PipelineState::default().snapshot();
        assert_eq!(snapshot.status, PipelineStatus::Idle);
        assert_eq!(snapshot.record_count, 0);
        assert!(snapshot.classifier.is_none());
        assert!(!snapshot.degraded);
    }

    #[test]
    fn test_load_outcome_messages() {
        assert_eq!(LoadOutcome::Live { count: 3 }.message(), "Loaded 3 products.");
        let degraded = LoadOutcome::Degraded {
            count: 50,
            cause: "connection refused".to_string(),
        };
        assert!(degraded.message().contains("degraded"));
        assert!(degraded.message().contains("50 synthetic"));
        assert_eq!(degraded.count(), 50);
        assert!(degraded.is_degraded());
    }

    #[test]
    fn test_load_outcome_json() {
        let json = serde_json::to_value(LoadOutcome::Live { count: 2 }).unwrap();
        assert_eq!(json["outcome"], "live");
        assert_eq!(json["count"], 2);
    }
}
