// src/models/mlp.rs
//
// Multilayer perceptron: one ReLU hidden layer and a softmax output, trained
// with Adam on shuffled minibatches using candle's CPU backend.

use candle_core::{DType, Device, Module, Tensor, Var, D};
use candle_nn::{loss, AdamW, Linear, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::estimator::{backend_error, validate_rows, validate_training, Estimator, EstimatorParams};
use crate::error::ModelError;

pub const DEFAULT_HIDDEN: usize = 100;
pub const DEFAULT_MLP_MAX_ITER: usize = 500;
pub const DEFAULT_MLP_SEED: u64 = 42;

const MAX_BATCH: usize = 200;
/// Epochs without a `tol` improvement before training stops
const PATIENCE: usize = 10;

/// Dense layer, `weights` is `out x in`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DenseLayer {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl DenseLayer {
    fn from_vars(weights: &Var, bias: &Var) -> candle_core::Result<Self> {
        Ok(Self {
            weights: weights.as_tensor().to_vec2::<f32>()?,
            bias: bias.as_tensor().to_vec1::<f32>()?,
        })
    }

    fn linear(&self, device: &Device) -> candle_core::Result<Linear> {
        let out = self.weights.len();
        let input = self.weights.first().map_or(0, Vec::len);
        let flat: Vec<f32> = self.weights.iter().flatten().copied().collect();
        let weights = Tensor::from_vec(flat, (out, input), device)?;
        let bias = Tensor::from_vec(self.bias.clone(), out, device)?;
        Ok(Linear::new(weights, Some(bias)))
    }
}

/// Glorot-uniform weights and biases
fn init_layer(
    rng: &mut StdRng,
    fan_in: usize,
    fan_out: usize,
    device: &Device,
) -> candle_core::Result<(Var, Var)> {
    let bound = (6.0 / (fan_in + fan_out) as f32).sqrt();
    let mut sample = |n: usize| -> Vec<f32> { (0..n).map(|_| rng.gen_range(-bound..bound)).collect() };
    let weights = Var::from_vec(sample(fan_in * fan_out), (fan_out, fan_in), device)?;
    let bias = Var::from_vec(sample(fan_out), fan_out, device)?;
    Ok((weights, bias))
}

fn rows_tensor(x: &[Vec<f32>], dim: usize, device: &Device) -> candle_core::Result<Tensor> {
    let flat: Vec<f32> = x.iter().flatten().copied().collect();
    Tensor::from_vec(flat, (x.len(), dim), device)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultilayerPerceptron {
    hidden: usize,
    learning_rate: f64,
    /// L2 penalty on the weights
    alpha: f64,
    max_iter: usize,
    tol: f64,
    seed: u64,
    #[serde(default)]
    layers: Vec<DenseLayer>,
    #[serde(default)]
    epochs_run: usize,
}

impl Default for MultilayerPerceptron {
    fn default() -> Self {
        Self::new(DEFAULT_HIDDEN)
    }
}

impl MultilayerPerceptron {
    pub fn new(hidden: usize) -> Self {
        Self {
            hidden,
            learning_rate: 1e-3,
            alpha: 1e-4,
            max_iter: DEFAULT_MLP_MAX_ITER,
            tol: 1e-4,
            seed: DEFAULT_MLP_SEED,
            layers: Vec::new(),
            epochs_run: 0,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Epochs the last `fit` ran before converging or hitting `max_iter`
    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }

    fn input_dim(&self) -> Option<usize> {
        self.layers.first()?.weights.first().map(Vec::len)
    }

    fn train(&mut self, x: &[Vec<f32>], y: &[usize], dim: usize) -> candle_core::Result<()> {
        let device = Device::Cpu;
        let n_out = y.iter().max().map_or(1, |m| m + 1);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let (w1, b1) = init_layer(&mut rng, dim, self.hidden, &device)?;
        let (w2, b2) = init_layer(&mut rng, self.hidden, n_out, &device)?;
        let hidden = Linear::new(w1.as_tensor().clone(), Some(b1.as_tensor().clone()));
        let output = Linear::new(w2.as_tensor().clone(), Some(b2.as_tensor().clone()));
        let params = ParamsAdamW {
            lr: self.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(vec![w1.clone(), b1.clone(), w2.clone(), b2.clone()], params)?;

        let inputs = rows_tensor(x, dim, &device)?;
        let targets: Vec<u32> = y.iter().map(|&l| l as u32).collect();
        let targets = Tensor::from_vec(targets, y.len(), &device)?;
        let mut order: Vec<u32> = (0..x.len() as u32).collect();
        let batch = MAX_BATCH.min(x.len());

        let mut best = f64::INFINITY;
        let mut stale = 0;
        self.epochs_run = 0;
        for _ in 0..self.max_iter {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            for chunk in order.chunks(batch) {
                let idx = Tensor::new(chunk, &device)?;
                let xb = inputs.index_select(&idx, 0)?;
                let yb = targets.index_select(&idx, 0)?;

                let logits = output.forward(&hidden.forward(&xb)?.relu()?)?;
                let l2 = (w1.as_tensor().sqr()?.sum_all()? + w2.as_tensor().sqr()?.sum_all()?)?;
                let penalty = (l2 * (self.alpha / (2.0 * chunk.len() as f64)))?;
                let batch_loss = (loss::cross_entropy(&logits, &yb)? + penalty)?;
                optimizer.backward_step(&batch_loss)?;
                epoch_loss += batch_loss.to_dtype(DType::F64)?.to_scalar::<f64>()? * chunk.len() as f64;
            }
            epoch_loss /= x.len() as f64;
            self.epochs_run += 1;

            if !epoch_loss.is_finite() {
                candle_core::bail!("training loss diverged after {} epochs", self.epochs_run);
            }
            if epoch_loss > best - self.tol {
                stale += 1;
            } else {
                stale = 0;
            }
            best = best.min(epoch_loss);
            if stale >= PATIENCE {
                break;
            }
        }

        self.layers = vec![DenseLayer::from_vars(&w1, &b1)?, DenseLayer::from_vars(&w2, &b2)?];
        Ok(())
    }

    fn infer(&self, x: &[Vec<f32>], dim: usize) -> candle_core::Result<Vec<u32>> {
        let device = Device::Cpu;
        let mut h = rows_tensor(x, dim, &device)?;
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.linear(&device)?.forward(&h)?;
            if i + 1 < self.layers.len() {
                h = h.relu()?;
            }
        }
        h.argmax(D::Minus1)?.to_vec1::<u32>()
    }
}

impl Estimator for MultilayerPerceptron {
    fn kind(&self) -> &'static str {
        "mlp"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[usize]) -> Result<(), ModelError> {
        if self.hidden == 0 || self.max_iter == 0 {
            return Err(ModelError::InvalidParameter(
                "hidden units and max_iter must be at least 1".into(),
            ));
        }
        let dim = validate_training(x, y)?;
        self.train(x, y, dim).map_err(backend_error)
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<usize>, ModelError> {
        let dim = self.input_dim().ok_or(ModelError::NotFitted)?;
        validate_rows(x, dim)?;
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let labels = self.infer(x, dim).map_err(backend_error)?;
        Ok(labels.into_iter().map(|l| l as usize).collect())
    }

    fn export(&self) -> Option<EstimatorParams> {
        Some(EstimatorParams::Mlp(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_like() -> (Vec<Vec<f32>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let jitter = (i % 5) as f32 * 0.02;
            let (a, b) = ((i / 2) % 2, i % 2);
            x.push(vec![a as f32 + jitter, b as f32 - jitter]);
            y.push(a ^ b);
        }
        (x, y)
    }

    #[test]
    fn test_learns_nonlinear_boundary() {
        let (x, y) = xor_like();
        let mut mlp = MultilayerPerceptron::new(16).with_max_iter(2000).with_seed(3);
        mlp.learning_rate = 0.01;
        mlp.tol = 0.0;
        mlp.fit(&x, &y).unwrap();
        assert!(mlp.epochs_run() > 0);
        assert_eq!(mlp.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (x, y) = xor_like();
        let mut a = MultilayerPerceptron::new(8).with_max_iter(20);
        let mut b = MultilayerPerceptron::new(8).with_max_iter(20);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.layers, b.layers);
        assert_eq!(a.layers[0].weights.len(), 8);
        assert_eq!(a.layers[1].bias.len(), 2);
    }

    #[test]
    fn test_export_round_trip_predicts_identically() {
        let (x, y) = xor_like();
        let mut mlp = MultilayerPerceptron::new(8).with_max_iter(50);
        mlp.fit(&x, &y).unwrap();
        let json = serde_json::to_string(&mlp.export().unwrap()).unwrap();
        let restored: EstimatorParams = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.into_estimator().predict(&x).unwrap(), mlp.predict(&x).unwrap());
    }

    #[test]
    fn test_errors() {
        let mlp = MultilayerPerceptron::default();
        assert_eq!(mlp.predict(&[vec![1.0]]), Err(ModelError::NotFitted));

        let mut mlp = MultilayerPerceptron::new(0);
        assert!(matches!(
            mlp.fit(&[vec![1.0]], &[0]),
            Err(ModelError::InvalidParameter(_))
        ));

        let (x, y) = xor_like();
        let mut mlp = MultilayerPerceptron::new(4).with_max_iter(5);
        mlp.fit(&x, &y).unwrap();
        assert!(matches!(
            mlp.predict(&[vec![1.0, 2.0, 3.0]]),
            Err(ModelError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }
}
