//! Reorder classifier and its lifecycle

use super::network::Network;
use serde::{Deserialize, Serialize};

/// Lifecycle of a classifier instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierState {
    Untrained,
    Training,
    Trained,
    Failed,
}

/// Statistics recorded when a fit completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub positive_rows: usize,
    pub epochs: usize,
    pub final_loss: f64,
    pub training_accuracy: f64,
    pub trained_at: i64,
}

/// Binary reorder classifier.
///
/// Each instance carries the `generation` of the training run that created
/// it; a new run always creates a new instance.
#[derive(Debug, Clone)]
pub struct Classifier {
    generation: u64,
    state: ClassifierState,
    network: Option<Network>,
    report: Option<TrainingReport>,
    failure: Option<String>,
}

impl Classifier {
    pub fn untrained() -> Self {
        Self {
            generation: 0,
            state: ClassifierState::Untrained,
            network: None,
            report: None,
            failure: None,
        }
    }

    pub(crate) fn training(generation: u64) -> Self {
        Self {
            generation,
            state: ClassifierState::Training,
            ..Self::untrained()
        }
    }

    pub(crate) fn trained(generation: u64, network: Network, report: TrainingReport) -> Self {
        Self {
            generation,
            state: ClassifierState::Trained,
            network: Some(network),
            report: Some(report),
            failure: None,
        }
    }

    pub(crate) fn failed(generation: u64, cause: impl Into<String>) -> Self {
        Self {
            generation,
            state: ClassifierState::Failed,
            failure: Some(cause.into()),
            ..Self::untrained()
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    pub fn is_trained(&self) -> bool {
        self.state == ClassifierState::Trained
    }

    /// Fitted network, present only in the `Trained` state
    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn summary(&self) -> ClassifierSummary {
        ClassifierSummary {
            generation: self.generation,
            state: self.state,
            report: self.report.clone(),
            failure: self.failure.clone(),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::untrained()
    }
}

/// Serializable view of a classifier for status reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSummary {
    pub generation: u64,
    pub state: ClassifierState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<TrainingReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}
