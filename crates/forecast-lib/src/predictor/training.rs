//! Training session for the reorder classifier
//!
//! Fits a fresh network on the full training set each time it is invoked.
//! There is no incremental learning and no fallback to a previous model: a
//! new run discards the previous classifier whether or not it succeeds.

use super::classifier::{Classifier, TrainingReport};
use super::features::TrainingSet;
use super::network::{Activation, FeatureScaler, Network};
use super::optimizer::{normalize_tag, Optimizer, OptimizerKind};
use crate::error::{PipelineError, Result};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default number of passes over the training set
pub const DEFAULT_EPOCHS: usize = 60;

/// Default mini-batch size
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Default optimizer step size
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` inside the log loss
const LOSS_EPSILON: f64 = 1e-7;

/// One hidden layer of the network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub units: usize,
    #[serde(default)]
    pub activation: Activation,
}

impl LayerSpec {
    pub fn new(units: usize, activation: Activation) -> Self {
        Self { units, activation }
    }
}

/// Training options. Unknown keys are ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingConfig {
    pub hidden_layers: Vec<LayerSpec>,
    pub epochs: usize,
    pub shuffle_each_epoch: bool,
    /// Optimizer tag: `adam` or `sgd`
    pub optimizer: String,
    /// Loss tag: `binaryCrossentropy` or `meanSquaredError`
    pub loss_function: String,
    pub learning_rate: f64,
    pub batch_size: usize,
    /// Fixed seed for weight init and shuffling; entropy when absent
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![
                LayerSpec::new(12, Activation::Relu),
                LayerSpec::new(8, Activation::Relu),
            ],
            epochs: DEFAULT_EPOCHS,
            shuffle_each_epoch: true,
            optimizer: "adam".to_string(),
            loss_function: "binaryCrossentropy".to_string(),
            learning_rate: DEFAULT_LEARNING_RATE,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self.hidden_layers.iter().position(|l| l.units == 0) {
            return Err(PipelineError::InvalidConfig(format!(
                "hidden layer {} has zero units",
                i
            )));
        }
        if self.epochs == 0 {
            return Err(PipelineError::InvalidConfig("epochs must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "batch size must be positive".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidConfig(
                "learning rate must be a finite positive number".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved optimizer; unknown tags fall back to Adam
    pub fn optimizer_kind(&self) -> OptimizerKind {
        OptimizerKind::from_tag(&self.optimizer).unwrap_or_else(|| {
            warn!(optimizer = %self.optimizer, "Unrecognized optimizer, using adam");
            OptimizerKind::Adam
        })
    }

    /// Resolved loss; unknown tags fall back to binary cross-entropy
    pub fn loss(&self) -> LossFunction {
        LossFunction::from_tag(&self.loss_function).unwrap_or_else(|| {
            warn!(loss = %self.loss_function, "Unrecognized loss function, using binaryCrossentropy");
            LossFunction::BinaryCrossentropy
        })
    }
}

/// Loss over a sigmoid output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossFunction {
    BinaryCrossentropy,
    MeanSquaredError,
}

impl LossFunction {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match normalize_tag(tag).as_str() {
            "binarycrossentropy" | "bce" => Some(Self::BinaryCrossentropy),
            "meansquarederror" | "mse" => Some(Self::MeanSquaredError),
            _ => None,
        }
    }

    /// Mean loss over a batch of probabilities `p` against labels `y`
    pub fn loss(&self, p: &Array2<f64>, y: &Array2<f64>) -> f64 {
        let n = p.len().max(1) as f64;
        match self {
            LossFunction::BinaryCrossentropy => {
                let total: f64 = p
                    .iter()
                    .zip(y.iter())
                    .map(|(&p, &y)| {
                        let p = p.clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
                        -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
                    })
                    .sum();
                total / n
            }
            LossFunction::MeanSquaredError => {
                p.iter().zip(y.iter()).map(|(p, y)| (p - y).powi(2)).sum::<f64>() / n
            }
        }
    }

    /// Gradient of the mean loss with respect to the output pre-activation
    pub fn output_delta(&self, p: &Array2<f64>, y: &Array2<f64>) -> Array2<f64> {
        let n = p.nrows().max(1) as f64;
        match self {
            LossFunction::BinaryCrossentropy => (p - y) / n,
            LossFunction::MeanSquaredError => {
                let sigmoid_grad = p.mapv(|v| v * (1.0 - v));
                (p - y) * sigmoid_grad * (2.0 / n)
            }
        }
    }
}

/// Row visiting order for one epoch
pub fn epoch_order<R: Rng>(rows: usize, shuffle: bool, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows).collect();
    if shuffle {
        order.shuffle(rng);
    }
    order
}

/// Gather `rows` of `m` in the given order. Features and labels are always
/// gathered with the same index slice so pairs stay aligned.
pub fn gather_rows(m: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    m.select(Axis(0), rows)
}

/// `(rows, 3)` matrix of raw features
pub fn design_matrix(set: &TrainingSet) -> Array2<f64> {
    let mut x = Array2::zeros((set.len(), crate::models::FeatureVector::WIDTH));
    for (mut row, f) in x.rows_mut().into_iter().zip(set.features()) {
        for (cell, v) in row.iter_mut().zip(f.to_array()) {
            *cell = v;
        }
    }
    x
}

/// `(rows, 1)` matrix of labels
pub fn label_column(set: &TrainingSet) -> Array2<f64> {
    Array2::from_shape_fn((set.len(), 1), |(i, _)| f64::from(set.labels()[i]))
}

/// Owns the current classifier and replaces it on every fit
#[derive(Debug, Default)]
pub struct TrainingSession {
    classifier: Classifier,
    generation: u64,
}

impl TrainingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Fit a new classifier on `set`.
    ///
    /// Config errors and an empty set are rejected before the current
    /// classifier is touched. Otherwise the current classifier is discarded
    /// and the new one ends up `Trained` or `Failed`.
    pub fn fit(&mut self, set: &TrainingSet, config: &TrainingConfig) -> Result<Classifier> {
        config.validate()?;
        if set.is_empty() {
            return Err(PipelineError::EmptyTrainingSet);
        }

        self.generation += 1;
        self.classifier = Classifier::training(self.generation);
        info!(
            generation = self.generation,
            rows = set.len(),
            positive_rows = set.positive_count(),
            epochs = config.epochs,
            "Fitting reorder classifier"
        );

        match fit_network(set, config) {
            Ok((network, report)) => {
                info!(
                    generation = self.generation,
                    final_loss = report.final_loss,
                    training_accuracy = report.training_accuracy,
                    "Classifier trained"
                );
                self.classifier = Classifier::trained(self.generation, network, report);
                Ok(self.classifier.clone())
            }
            Err(cause) => {
                warn!(generation = self.generation, cause = %cause, "Classifier training failed");
                self.classifier = Classifier::failed(self.generation, cause.clone());
                Err(PipelineError::TrainingFailed(cause))
            }
        }
    }
}

/// Run the optimisation loop. Every intermediate buffer (design matrix,
/// batches, activations, optimizer moments) is owned by this function and
/// dropped when it returns, on success and on failure.
fn fit_network(
    set: &TrainingSet,
    config: &TrainingConfig,
) -> std::result::Result<(Network, TrainingReport), String> {
    let mut rng = match config.seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    };
    let loss = config.loss();

    let x = design_matrix(set);
    let y = label_column(set);
    let scaler = FeatureScaler::fit(&x);
    let xs = scaler.transform(&x);

    let hidden: Vec<(usize, Activation)> = config
        .hidden_layers
        .iter()
        .map(|l| (l.units, l.activation))
        .collect();
    let mut network = Network::new(scaler, &hidden, &mut rng);
    let mut optimizer = Optimizer::new(config.optimizer_kind(), config.learning_rate, &network);

    let rows = set.len();
    let mut epoch_loss = f64::NAN;
    for epoch in 1..=config.epochs {
        let order = epoch_order(rows, config.shuffle_each_epoch, &mut rng);
        let mut loss_sum = 0.0;

        for batch in order.chunks(config.batch_size) {
            let xb = gather_rows(&xs, batch);
            let yb = gather_rows(&y, batch);

            let pass = network.forward(&xb);
            let batch_loss = loss.loss(pass.output(), &yb);
            if !batch_loss.is_finite() {
                return Err(format!("loss became non-finite at epoch {}", epoch));
            }
            loss_sum += batch_loss * batch.len() as f64;

            let delta = loss.output_delta(pass.output(), &yb);
            let gradients = network.backward(&pass, delta);
            optimizer.step(&mut network, &gradients);
        }

        if !network.is_finite() {
            return Err(format!("weights diverged at epoch {}", epoch));
        }
        epoch_loss = loss_sum / rows as f64;
        if epoch % 10 == 0 {
            debug!(epoch, loss = epoch_loss, "Training progress");
        }
    }

    let predictions = network.forward(&xs);
    let correct = predictions
        .output()
        .iter()
        .zip(y.iter())
        .filter(|(p, label)| (**p > 0.5) == (**label > 0.5))
        .count();

    let report = TrainingReport {
        rows,
        positive_rows: set.positive_count(),
        epochs: config.epochs,
        final_loss: epoch_loss,
        training_accuracy: correct as f64 / rows as f64,
        trained_at: chrono::Utc::now().timestamp(),
    };
    Ok((network, report))
}
