// src/models/naive_bayes.rs
//
// Gaussian naive Bayes. Per-label feature means and variances, log-space
// posterior, variance floor proportional to the largest feature variance.

use serde::{Deserialize, Serialize};

use super::estimator::{validate_rows, validate_training, Estimator, EstimatorParams};
use crate::error::ModelError;

pub const DEFAULT_VAR_SMOOTHING: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    var_smoothing: f64,
    #[serde(default)]
    classes: Vec<ClassStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClassStats {
    label: usize,
    log_prior: f64,
    mean: Vec<f64>,
    var: Vec<f64>,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new(DEFAULT_VAR_SMOOTHING)
    }
}

impl GaussianNaiveBayes {
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            classes: Vec::new(),
        }
    }

    fn joint_log_likelihood(stats: &ClassStats, row: &[f32]) -> f64 {
        let mut ll = stats.log_prior;
        for ((&v, &m), &var) in row.iter().zip(&stats.mean).zip(&stats.var) {
            let d = v as f64 - m;
            ll -= 0.5 * ((2.0 * std::f64::consts::PI * var).ln() + d * d / var);
        }
        ll
    }
}

impl Estimator for GaussianNaiveBayes {
    fn kind(&self) -> &'static str {
        "gaussian_nb"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[usize]) -> Result<(), ModelError> {
        if !(self.var_smoothing >= 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "var_smoothing must be non-negative, got {}",
                self.var_smoothing
            )));
        }
        let dim = validate_training(x, y)?;
        let n = x.len() as f64;

        // Largest per-feature variance over the whole training set
        let mut global_mean = vec![0.0f64; dim];
        for row in x {
            for (m, &v) in global_mean.iter_mut().zip(row) {
                *m += v as f64 / n;
            }
        }
        let mut max_var = 0.0f64;
        for j in 0..dim {
            let var = x
                .iter()
                .map(|row| (row[j] as f64 - global_mean[j]).powi(2))
                .sum::<f64>()
                / n;
            max_var = max_var.max(var);
        }
        let epsilon = (self.var_smoothing * max_var).max(1e-12);

        let n_labels = y.iter().max().map_or(0, |m| m + 1);
        let mut classes = Vec::new();
        for label in 0..n_labels {
            let rows: Vec<&Vec<f32>> = x
                .iter()
                .zip(y)
                .filter(|&(_, &l)| l == label)
                .map(|(r, _)| r)
                .collect();
            if rows.is_empty() {
                continue;
            }
            let count = rows.len() as f64;
            let mut mean = vec![0.0f64; dim];
            for row in &rows {
                for (m, &v) in mean.iter_mut().zip(row.iter()) {
                    *m += v as f64 / count;
                }
            }
            let mut var = vec![0.0f64; dim];
            for row in &rows {
                for ((acc, &v), &m) in var.iter_mut().zip(row.iter()).zip(&mean) {
                    *acc += (v as f64 - m).powi(2) / count;
                }
            }
            var.iter_mut().for_each(|v| *v += epsilon);

            classes.push(ClassStats {
                label,
                log_prior: (count / n).ln(),
                mean,
                var,
            });
        }

        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<usize>, ModelError> {
        let dim = self
            .classes
            .first()
            .map(|c| c.mean.len())
            .ok_or(ModelError::NotFitted)?;
        validate_rows(x, dim)?;

        x.iter()
            .map(|row| {
                let mut best: Option<(f64, usize)> = None;
                for stats in &self.classes {
                    let ll = Self::joint_log_likelihood(stats, row);
                    if !ll.is_finite() {
                        return Err(ModelError::Numerical(format!(
                            "non-finite likelihood for label {}",
                            stats.label
                        )));
                    }
                    if best.map_or(true, |(b, _)| ll > b) {
                        best = Some((ll, stats.label));
                    }
                }
                best.map(|(_, label)| label).ok_or(ModelError::NotFitted)
            })
            .collect()
    }

    fn export(&self) -> Option<EstimatorParams> {
        Some(EstimatorParams::GaussianNb(self.clone()))
    }
}
