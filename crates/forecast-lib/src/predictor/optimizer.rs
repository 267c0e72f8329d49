//! Parameter update rules for training

use super::network::{LayerGradient, Network};
use ndarray::{Array1, Array2};

/// Supported optimizers, selected by string tag in the training config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl OptimizerKind {
    /// Resolve a config tag; case and `_`/`-` separators are ignored
    pub fn from_tag(tag: &str) -> Option<Self> {
        match normalize_tag(tag).as_str() {
            "adam" => Some(Self::Adam),
            "sgd" => Some(Self::Sgd),
            _ => None,
        }
    }
}

pub(crate) fn normalize_tag(tag: &str) -> String {
    tag.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// First and second moment estimates for one layer
struct LayerMoments {
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

/// Optimizer state for one training run.
///
/// Adam defaults follow the common `beta1 = 0.9`, `beta2 = 0.999`,
/// `epsilon = 1e-7`.
pub struct Optimizer {
    kind: OptimizerKind,
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    moments: Vec<LayerMoments>,
}

impl Optimizer {
    pub fn new(kind: OptimizerKind, learning_rate: f64, network: &Network) -> Self {
        let moments = match kind {
            OptimizerKind::Adam => network
                .layers()
                .iter()
                .map(|l| LayerMoments {
                    m_w: Array2::zeros(l.weights.raw_dim()),
                    v_w: Array2::zeros(l.weights.raw_dim()),
                    m_b: Array1::zeros(l.biases.len()),
                    v_b: Array1::zeros(l.biases.len()),
                })
                .collect(),
            OptimizerKind::Sgd => Vec::new(),
        };

        Self {
            kind,
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            moments,
        }
    }

    /// Apply one update step; `gradients` are aligned with the network's layers
    pub fn step(&mut self, network: &mut Network, gradients: &[LayerGradient]) {
        match self.kind {
            OptimizerKind::Sgd => {
                let lr = self.learning_rate;
                for (layer, grad) in network.layers_mut().iter_mut().zip(gradients) {
                    layer.weights.scaled_add(-lr, &grad.weights);
                    layer.biases.scaled_add(-lr, &grad.biases);
                }
            }
            OptimizerKind::Adam => {
                self.t = self.t.saturating_add(1);
                let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
                let correction1 = 1.0 - b1.powi(self.t);
                let correction2 = 1.0 - b2.powi(self.t);
                let step_size = self.learning_rate * correction2.sqrt() / correction1;

                for ((layer, grad), m) in network
                    .layers_mut()
                    .iter_mut()
                    .zip(gradients)
                    .zip(self.moments.iter_mut())
                {
                    m.m_w = &m.m_w * b1 + &grad.weights * (1.0 - b1);
                    m.v_w = &m.v_w * b2 + &grad.weights.mapv(|g| g * g) * (1.0 - b2);
                    m.m_b = &m.m_b * b1 + &grad.biases * (1.0 - b1);
                    m.v_b = &m.v_b * b2 + &grad.biases.mapv(|g| g * g) * (1.0 - b2);

                    layer
                        .weights
                        .scaled_add(-step_size, &(&m.m_w / &m.v_w.mapv(|v| v.sqrt() + eps)));
                    layer
                        .biases
                        .scaled_add(-step_size, &(&m.m_b / &m.v_b.mapv(|v| v.sqrt() + eps)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::network::{Activation, FeatureScaler};
    use ndarray::array;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn tiny_network() -> Network {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let scaler = FeatureScaler::fit(&array![[1.0, 2.0, 3.0], [2.0, 3.0, 4.0]]);
        Network::new(scaler, &[(4, Activation::Relu)], &mut rng)
    }

    fn uniform_gradients(network: &Network, value: f64) -> Vec<LayerGradient> {
        network
            .layers()
            .iter()
            .map(|l| LayerGradient {
                weights: Array2::from_elem(l.weights.raw_dim(), value),
                biases: Array1::from_elem(l.biases.len(), value),
            })
            .collect()
    }

    #[test]
    fn test_tags() {
        assert_eq!(OptimizerKind::from_tag("adam"), Some(OptimizerKind::Adam));
        assert_eq!(OptimizerKind::from_tag("ADAM"), Some(OptimizerKind::Adam));
        assert_eq!(OptimizerKind::from_tag("sgd"), Some(OptimizerKind::Sgd));
        assert_eq!(OptimizerKind::from_tag("rmsprop"), None);
    }

    #[test]
    fn test_sgd_moves_against_gradient() {
        let mut net = tiny_network();
        let before = net.layers()[1].biases[0];
        let grads = uniform_gradients(&net, 1.0);

        let mut opt = Optimizer::new(OptimizerKind::Sgd, 0.1, &net);
        opt.step(&mut net, &grads);

        assert!((net.layers()[1].biases[0] - (before - 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_adam_first_step_is_learning_rate_sized() {
        let mut net = tiny_network();
        let before = net.layers()[0].weights[[0, 0]];
        let grads = uniform_gradients(&net, 0.5);

        let mut opt = Optimizer::new(OptimizerKind::Adam, 0.01, &net);
        opt.step(&mut net, &grads);

        // Bias-corrected first Adam step has magnitude ~learning_rate
        let delta = before - net.layers()[0].weights[[0, 0]];
        assert!((delta - 0.01).abs() < 1e-4, "delta was {}", delta);
    }
}
