//! Reorder classification: features, training and inference

mod classifier;
mod features;
mod inference;
mod network;
mod optimizer;
mod output;
mod training;

pub use classifier::{Classifier, ClassifierState, ClassifierSummary, TrainingReport};
pub use features::{
    coerce, extract, label, TrainingSet, DEFAULT_AVERAGE_SALES, DEFAULT_INVENTORY_LEVEL,
    DEFAULT_LEAD_TIME_DAYS, LABEL_NO_REORDER, LABEL_REORDER,
};
pub use inference::{predict, ReorderPredictor};
pub use network::{Activation, FeatureScaler, Network};
pub use optimizer::OptimizerKind;
pub use output::{decision_label, ReorderDecision, REORDER_THRESHOLD, UNAVAILABLE_LABEL};
pub use training::{
    LayerSpec, LossFunction, TrainingConfig, TrainingSession, DEFAULT_BATCH_SIZE,
    DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE,
};
