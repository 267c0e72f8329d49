//! Feature extraction for reorder classification
//!
//! Maps inventory records to `[inventory_level, average_sales, lead_time_days]`
//! and derives the supervisory label.
//!
//! The label is synthetic: it is computed from the same record as the
//! features (`inventory_level < average_sales * lead_time_days`), so the
//! classifier learns to recover a known rule rather than an observed
//! outcome.

use crate::models::{FeatureVector, InventoryRecord, RecordId};
use tracing::debug;

/// Default inventory level when the field is absent
pub const DEFAULT_INVENTORY_LEVEL: f64 = 0.0;

/// Default average sales when absent or non-positive
pub const DEFAULT_AVERAGE_SALES: f64 = 1.0;

/// Default lead time when absent or non-positive
pub const DEFAULT_LEAD_TIME_DAYS: f64 = 1.0;

/// Label value for "reorder needed"
pub const LABEL_REORDER: u8 = 1;

/// Label value for "no reorder needed"
pub const LABEL_NO_REORDER: u8 = 0;

/// Coerce a record's numeric attributes into a feature vector.
///
/// Returns `None` when any attribute is non-finite or the inventory level is
/// negative.
pub fn coerce(record: &InventoryRecord) -> Option<FeatureVector> {
    let inventory_level = record.inventory_level.unwrap_or(DEFAULT_INVENTORY_LEVEL);
    if !inventory_level.is_finite() || inventory_level < 0.0 {
        return None;
    }

    Some(FeatureVector {
        inventory_level,
        average_sales: positive_or(record.average_sales, DEFAULT_AVERAGE_SALES)?,
        lead_time_days: positive_or(record.lead_time_days, DEFAULT_LEAD_TIME_DAYS)?,
    })
}

fn positive_or(value: Option<f64>, default: f64) -> Option<f64> {
    match value {
        None => Some(default),
        Some(v) if !v.is_finite() => None,
        Some(v) if v <= 0.0 => Some(default),
        Some(v) => Some(v),
    }
}

/// Reorder label: 1 iff inventory is strictly below projected demand
pub fn label(features: &FeatureVector) -> u8 {
    if features.inventory_level < features.projected_demand() {
        LABEL_REORDER
    } else {
        LABEL_NO_REORDER
    }
}

/// Feature vectors paired with labels, in source-record order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    ids: Vec<RecordId>,
    features: Vec<FeatureVector>,
    labels: Vec<u8>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Source record ids, aligned with `features` and `labels`
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Number of rows labelled "reorder"
    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == LABEL_REORDER).count()
    }

    fn push(&mut self, id: RecordId, features: FeatureVector) {
        self.labels.push(label(&features));
        self.features.push(features);
        self.ids.push(id);
    }
}

/// Build a training set from a catalog snapshot.
///
/// Records that cannot be coerced are skipped; everything else keeps its
/// relative order.
pub fn extract(records: &[InventoryRecord]) -> TrainingSet {
    let mut set = TrainingSet::default();
    for record in records {
        if let Some(features) = coerce(record) {
            set.push(record.id.clone(), features);
        }
    }

    let excluded = records.len() - set.len();
    if excluded > 0 {
        debug!(excluded, kept = set.len(), "Excluded malformed records from training set");
    }
    set
}
