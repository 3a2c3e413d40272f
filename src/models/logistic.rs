// src/models/logistic.rs
//
// Multinomial logistic regression trained by full-batch gradient descent on
// the L2-regularized softmax cross-entropy.

use serde::{Deserialize, Serialize};

use super::estimator::{validate_rows, validate_training, Estimator, EstimatorParams};
use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub learning_rate: f32,
    pub max_iter: usize,
    /// Inverse regularization strength
    pub c: f32,
    /// Stop once the largest gradient component falls below this
    pub tol: f32,
    #[serde(default)]
    weights: Vec<Vec<f32>>,
    #[serde(default)]
    bias: Vec<f32>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 500,
            c: 1.0,
            tol: 1e-4,
            weights: Vec::new(),
            bias: Vec::new(),
        }
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn logits(&self, row: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(row).map(|(a, x)| a * x).sum::<f32>() + b)
            .collect()
    }
}

fn softmax_in_place(z: &mut [f32]) {
    let max = z.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in z.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in z.iter_mut() {
        *v /= sum;
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

impl Estimator for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[usize]) -> Result<(), ModelError> {
        if !(self.learning_rate > 0.0) || !(self.c > 0.0) {
            return Err(ModelError::InvalidParameter(
                "learning_rate and c must be positive".into(),
            ));
        }
        let dim = validate_training(x, y)?;
        let n_labels = y.iter().max().map_or(0, |m| m + 1);
        let n = x.len() as f32;
        let alpha = 1.0 / (self.c * n);

        self.weights = vec![vec![0.0; dim]; n_labels];
        self.bias = vec![0.0; n_labels];

        let mut grad_w = vec![vec![0.0f32; dim]; n_labels];
        let mut grad_b = vec![0.0f32; n_labels];

        for iter in 0..self.max_iter {
            grad_w.iter_mut().for_each(|g| g.iter_mut().for_each(|v| *v = 0.0));
            grad_b.iter_mut().for_each(|v| *v = 0.0);

            for (row, &label) in x.iter().zip(y) {
                let mut p = self.logits(row);
                softmax_in_place(&mut p);
                p[label] -= 1.0;
                for (k, &err) in p.iter().enumerate() {
                    grad_b[k] += err / n;
                    for (g, &v) in grad_w[k].iter_mut().zip(row) {
                        *g += err * v / n;
                    }
                }
            }

            let mut max_grad = 0.0f32;
            for k in 0..n_labels {
                for (w, g) in self.weights[k].iter_mut().zip(&mut grad_w[k]) {
                    *g += alpha * *w;
                    max_grad = max_grad.max(g.abs());
                    *w -= self.learning_rate * *g;
                }
                max_grad = max_grad.max(grad_b[k].abs());
                self.bias[k] -= self.learning_rate * grad_b[k];
            }

            if !max_grad.is_finite() {
                return Err(ModelError::Numerical(format!(
                    "gradient diverged at iteration {}",
                    iter
                )));
            }
            if max_grad < self.tol {
                log::debug!("logistic regression converged after {} iterations", iter + 1);
                break;
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<usize>, ModelError> {
        let dim = self.weights.first().map(Vec::len).ok_or(ModelError::NotFitted)?;
        validate_rows(x, dim)?;
        Ok(x.iter().map(|row| argmax(&self.logits(row))).collect())
    }

    fn export(&self) -> Option<EstimatorParams> {
        Some(EstimatorParams::Logistic(self.clone()))
    }
}
