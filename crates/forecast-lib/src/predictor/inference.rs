//! Inference against a fitted reorder classifier

use super::classifier::Classifier;
use crate::error::{PipelineError, Result};
use crate::models::FeatureVector;
use std::time::Instant;
use tracing::{debug, warn};

/// Single predictions slower than this are logged
const MAX_INFERENCE_MS: u128 = 5;

/// Anything that can score a feature vector with a reorder probability
pub trait ReorderPredictor: Send + Sync {
    /// Probability in `[0, 1]` that the item needs reordering
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Generation of the model backing this predictor
    fn generation(&self) -> u64;
}

impl ReorderPredictor for Classifier {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        predict(self, features)
    }

    fn generation(&self) -> u64 {
        Classifier::generation(self)
    }
}

/// Score `features` with `classifier`.
///
/// Fails with `ModelNotTrained` unless the classifier is trained. Reads only;
/// the classifier is never modified.
pub fn predict(classifier: &Classifier, features: &FeatureVector) -> Result<f64> {
    let network = match classifier.network() {
        Some(network) if classifier.is_trained() => network,
        _ => return Err(PipelineError::ModelNotTrained),
    };

    let start = Instant::now();
    let probability = network.predict_row(&features.to_array());
    let elapsed = start.elapsed();

    if elapsed.as_millis() > MAX_INFERENCE_MS {
        warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
    } else {
        debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
    }

    if probability.is_nan() {
        return Err(PipelineError::PredictionUnavailable(format!(
            "generation {} produced a non-numeric probability",
            classifier.generation()
        )));
    }
    Ok(probability.clamp(0.0, 1.0))
}
