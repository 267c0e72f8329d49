//! Core data models for the forecast pipeline

use crate::predictor::ReorderDecision;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-assigned record identity, numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

/// One inventory item as held by the pipeline.
///
/// Numeric attributes are kept as delivered: `None` when the source omitted
/// the field, `Some(f64::NAN)` when it was present but not numeric. Defaults
/// and exclusion are applied by [`crate::predictor::coerce`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: RecordId,
    pub name: String,
    pub inventory_level: Option<f64>,
    pub average_sales: Option<f64>,
    pub lead_time_days: Option<f64>,
}

impl InventoryRecord {
    pub fn new(
        id: impl Into<RecordId>,
        name: impl Into<String>,
        inventory_level: f64,
        average_sales: f64,
        lead_time_days: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inventory_level: Some(inventory_level),
            average_sales: Some(average_sales),
            lead_time_days: Some(lead_time_days),
        }
    }
}

/// Feature vector for classifier input: `[inventory_level, average_sales, lead_time_days]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub inventory_level: f64,
    pub average_sales: f64,
    pub lead_time_days: f64,
}

impl FeatureVector {
    pub const WIDTH: usize = 3;

    pub fn to_array(&self) -> [f64; Self::WIDTH] {
        [self.inventory_level, self.average_sales, self.lead_time_days]
    }

    /// Projected consumption over the replenishment window
    pub fn projected_demand(&self) -> f64 {
        self.average_sales * self.lead_time_days
    }
}

/// Classifier output for one catalog record, in catalog order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPrediction {
    pub id: RecordId,
    pub name: String,
    pub inventory_level: Option<f64>,
    pub average_sales: Option<f64>,
    pub lead_time_days: Option<f64>,
    /// `None` when no trained classifier is available or the record is malformed
    pub probability: Option<f64>,
    pub decision: Option<ReorderDecision>,
}

/// Predictions for the whole catalog and the classifier generation that
/// produced them, taken from one view of the pipeline state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPredictions {
    /// `None` when no trained classifier was available
    pub generation: Option<u64>,
    pub predictions: Vec<RecordPrediction>,
}
