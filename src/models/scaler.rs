//! Per-feature standardization (zero mean, unit variance)

use serde::{Deserialize, Serialize};

use super::estimator::{validate_matrix, validate_rows};
use crate::error::ModelError;

/// Standard scaler. Parameters are set by `fit` only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.mean.is_empty()
    }

    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    /// Per-feature standard deviation; constant features get 1.0
    pub fn scale(&self) -> &[f32] {
        &self.scale
    }

    pub fn fit(&mut self, x: &[Vec<f32>]) -> Result<(), ModelError> {
        let dim = validate_matrix(x)?;
        let n = x.len() as f64;

        let mut mean = vec![0.0f64; dim];
        for row in x {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v as f64;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0f64; dim];
        for row in x {
            for ((acc, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                let d = v as f64 - m;
                *acc += d * d;
            }
        }

        self.mean = mean.iter().map(|&m| m as f32).collect();
        self.scale = var
            .iter()
            .map(|&v| {
                let std = (v / n).sqrt();
                if std < 1e-12 { 1.0 } else { std as f32 }
            })
            .collect();
        Ok(())
    }

    pub fn transform_row(&self, row: &[f32]) -> Result<Vec<f32>, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        if row.len() != self.mean.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.mean.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, x: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        validate_rows(x, self.mean.len())?;
        x.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_standardizes() {
        let x = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&x).unwrap();
        assert_eq!(scaler.mean(), &[2.0, 5.0]);
        assert_eq!(scaler.scale(), &[1.0, 1.0]);
        let t = scaler.transform(&x).unwrap();
        assert_eq!(t, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_transform_leaves_parameters_untouched() {
        let train = vec![vec![0.0], vec![2.0], vec![4.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();
        let before = scaler.clone();

        let wild_test = vec![vec![1e6], vec![-1e6]];
        scaler.transform(&wild_test).unwrap();
        assert_eq!(scaler, before);
    }

    #[test]
    fn test_unfitted_and_mismatch() {
        let scaler = StandardScaler::new();
        assert_eq!(scaler.transform_row(&[1.0]), Err(ModelError::NotFitted));

        let mut scaler = StandardScaler::new();
        scaler.fit(&[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&[vec![1.0]]),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }
}
