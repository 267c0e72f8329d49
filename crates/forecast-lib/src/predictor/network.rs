//! Feed-forward network used by the reorder classifier
//!
//! Dense layers with configurable hidden activations and a single sigmoid
//! output unit. Inputs are standardised with per-column statistics fitted on
//! the training set, and those statistics travel with the network so
//! inference scales features exactly as training did.

use ndarray::{Array, Array1, Array2, Axis, Dimension};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as constant columns
const MIN_STD: f64 = 1e-9;

/// Layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
    Linear,
}

impl Activation {
    pub fn apply<D: Dimension>(&self, z: Array<f64, D>) -> Array<f64, D> {
        match self {
            Activation::Relu => z.mapv_into(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv_into(sigmoid),
            Activation::Linear => z,
        }
    }

    /// Derivative with respect to the pre-activation `z`
    pub fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => z.mapv(|v| {
                let s = sigmoid(v);
                s * (1.0 - s)
            }),
            Activation::Linear => Array2::ones(z.raw_dim()),
        }
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// Per-column standardisation fitted on training inputs
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl FeatureScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let std = x
            .std_axis(Axis(0), 0.0)
            .mapv_into(|s| if s.is_finite() && s > MIN_STD { s } else { 1.0 });
        Self { mean, std }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.std
    }

    pub fn transform_row(&self, row: &[f64]) -> Array1<f64> {
        (Array1::from_iter(row.iter().copied()) - &self.mean) / &self.std
    }
}

/// Fully connected layer; `weights` is `(inputs, units)`
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Glorot-uniform weights, zero biases
    fn new<R: Rng>(inputs: usize, units: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (inputs + units) as f64).sqrt();
        let weights = Array2::from_shape_fn((inputs, units), |_| rng.gen_range(-limit..limit));
        Self {
            weights,
            biases: Array1::zeros(units),
            activation,
        }
    }

    pub fn units(&self) -> usize {
        self.biases.len()
    }
}

/// Forward-pass intermediates needed for backpropagation
pub struct ForwardPass {
    /// Layer inputs followed by the network output; `len == layers + 1`
    pub activations: Vec<Array2<f64>>,
    /// Pre-activation values per layer
    pub pre_activations: Vec<Array2<f64>>,
}

impl ForwardPass {
    /// Network output, one probability per row
    pub fn output(&self) -> &Array2<f64> {
        &self.activations[self.activations.len() - 1]
    }
}

/// Weight and bias gradients for one layer
pub struct LayerGradient {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
}

/// Binary classifier network
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    layers: Vec<DenseLayer>,
    scaler: FeatureScaler,
}

impl Network {
    /// Build a network for `scaler`'s input width: hidden layers as given,
    /// then one sigmoid output unit.
    pub fn new<R: Rng>(scaler: FeatureScaler, hidden: &[(usize, Activation)], rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut inputs = scaler.mean.len();
        for &(units, activation) in hidden {
            layers.push(DenseLayer::new(inputs, units, activation, rng));
            inputs = units;
        }
        layers.push(DenseLayer::new(inputs, 1, Activation::Sigmoid, rng));
        Self { layers, scaler }
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    /// Batch forward pass over already-scaled inputs
    pub fn forward(&self, x: &Array2<f64>) -> ForwardPass {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        activations.push(x.to_owned());

        for layer in &self.layers {
            let z = activations[activations.len() - 1].dot(&layer.weights) + &layer.biases;
            activations.push(layer.activation.apply(z.clone()));
            pre_activations.push(z);
        }

        ForwardPass {
            activations,
            pre_activations,
        }
    }

    /// Backpropagate `output_delta` (dLoss/dz of the output layer)
    pub fn backward(&self, pass: &ForwardPass, output_delta: Array2<f64>) -> Vec<LayerGradient> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut delta = output_delta;

        for i in (0..self.layers.len()).rev() {
            gradients.push(LayerGradient {
                weights: pass.activations[i].t().dot(&delta),
                biases: delta.sum_axis(Axis(0)),
            });

            if i > 0 {
                delta = delta.dot(&self.layers[i].weights.t())
                    * self.layers[i - 1].activation.derivative(&pass.pre_activations[i - 1]);
            }
        }

        gradients.reverse();
        gradients
    }

    /// Probability for a single unscaled feature row.
    ///
    /// Allocates one small vector per layer, all dropped before returning.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut a = self.scaler.transform_row(row);
        for layer in &self.layers {
            a = layer.activation.apply(a.dot(&layer.weights) + &layer.biases);
        }
        a.get(0).copied().unwrap_or(f64::NAN)
    }

    /// True when every weight and bias is finite
    pub fn is_finite(&self) -> bool {
        self.layers.iter().all(|l| {
            l.weights.iter().all(|w| w.is_finite()) && l.biases.iter().all(|b| b.is_finite())
        })
    }
}
