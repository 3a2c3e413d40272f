// src/models/knn.rs
//
// k-nearest-neighbors classifier with Euclidean distance and majority vote.

use serde::{Deserialize, Serialize};

use super::estimator::{squared_distance, validate_rows, validate_training, Estimator, EstimatorParams};
use crate::error::ModelError;

pub const DEFAULT_K: usize = 5;

/// Lazy learner: `fit` memorizes the training rows. Vote ties go to the
/// lowest label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    k: usize,
    #[serde(default)]
    train_x: Vec<Vec<f32>>,
    #[serde(default)]
    train_y: Vec<usize>,
}

impl Default for KNearestNeighbors {
    fn default() -> Self {
        Self::new(DEFAULT_K)
    }
}

impl KNearestNeighbors {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            train_x: Vec::new(),
            train_y: Vec::new(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn predict_row(&self, row: &[f32]) -> usize {
        let mut neighbors: Vec<(f32, usize)> = self
            .train_x
            .iter()
            .zip(&self.train_y)
            .map(|(x, &y)| (squared_distance(x, row), y))
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let k = self.k.min(neighbors.len());
        let n_labels = self.train_y.iter().max().map_or(0, |m| m + 1);
        let mut votes = vec![0usize; n_labels];
        for &(_, label) in &neighbors[..k] {
            votes[label] += 1;
        }

        let mut best = 0;
        for (label, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = label;
            }
        }
        best
    }
}

impl Estimator for KNearestNeighbors {
    fn kind(&self) -> &'static str {
        "knn"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[usize]) -> Result<(), ModelError> {
        if self.k == 0 {
            return Err(ModelError::InvalidParameter("k must be at least 1".into()));
        }
        validate_training(x, y)?;
        self.train_x = x.to_vec();
        self.train_y = y.to_vec();
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<usize>, ModelError> {
        let dim = match self.train_x.first() {
            Some(row) => row.len(),
            None => return Err(ModelError::NotFitted),
        };
        validate_rows(x, dim)?;
        Ok(x.iter().map(|row| self.predict_row(row)).collect())
    }

    fn export(&self) -> Option<EstimatorParams> {
        Some(EstimatorParams::Knn(self.clone()))
    }
}
