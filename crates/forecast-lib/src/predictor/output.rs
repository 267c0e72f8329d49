//! Presentation mapping for reorder probabilities
//!
//! Kept apart from the predictor: the classifier only yields a probability,
//! and the threshold and labels here are a display concern.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Probabilities strictly above this are shown as "reorder"
pub const REORDER_THRESHOLD: f64 = 0.5;

/// Label shown when no trained classifier is available
pub const UNAVAILABLE_LABEL: &str = "Train model";

/// Reorder recommendation derived from a probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderDecision {
    Reorder,
    NoReorder,
}

impl ReorderDecision {
    pub fn from_probability(probability: f64) -> Self {
        if probability > REORDER_THRESHOLD {
            ReorderDecision::Reorder
        } else {
            ReorderDecision::NoReorder
        }
    }

    pub fn is_reorder(&self) -> bool {
        matches!(self, ReorderDecision::Reorder)
    }
}

impl fmt::Display for ReorderDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorderDecision::Reorder => write!(f, "Reorder"),
            ReorderDecision::NoReorder => write!(f, "No Reorder"),
        }
    }
}

/// Render a probability as `Reorder (83%)` / `No Reorder (12%)`, or the
/// unavailable label when there is none
pub fn decision_label(probability: Option<f64>) -> String {
    match probability {
        Some(p) => format!(
            "{} ({:.0}%)",
            ReorderDecision::from_probability(p),
            (p.clamp(0.0, 1.0) * 100.0).round()
        ),
        None => UNAVAILABLE_LABEL.to_string(),
    }
}
