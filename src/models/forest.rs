// src/models/forest.rs
//
// Random forest classifier backed by smartcore's bagged decision trees.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::estimator::{
    backend_error, dense_matrix, validate_rows, validate_training, Estimator, EstimatorParams,
};
use crate::error::ModelError;

pub const DEFAULT_TREES: u16 = 100;
pub const DEFAULT_FOREST_SEED: u64 = 42;

type Forest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Gini trees grown to full depth on bootstrap samples, sqrt(dim) candidate
/// features per split, majority vote across trees
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_trees: u16,
    seed: u64,
    #[serde(default)]
    dim: usize,
    #[serde(default)]
    forest: Option<Forest>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(DEFAULT_TREES, DEFAULT_FOREST_SEED)
    }
}

impl RandomForest {
    pub fn new(n_trees: u16, seed: u64) -> Self {
        Self {
            n_trees,
            seed,
            dim: 0,
            forest: None,
        }
    }

    pub fn n_trees(&self) -> u16 {
        self.n_trees
    }
}

impl Estimator for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[usize]) -> Result<(), ModelError> {
        if self.n_trees == 0 {
            return Err(ModelError::InvalidParameter("forest needs at least one tree".into()));
        }
        let dim = validate_training(x, y)?;
        let matrix = dense_matrix(x)?;
        let labels: Vec<u32> = y.iter().map(|&l| l as u32).collect();
        let params = RandomForestClassifierParameters::default()
            .with_n_trees(self.n_trees)
            .with_seed(self.seed);

        self.forest = Some(RandomForestClassifier::fit(&matrix, &labels, params).map_err(backend_error)?);
        self.dim = dim;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<usize>, ModelError> {
        let forest = self.forest.as_ref().ok_or(ModelError::NotFitted)?;
        validate_rows(x, self.dim)?;
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let predicted = forest.predict(&dense_matrix(x)?).map_err(backend_error)?;
        Ok(predicted.into_iter().map(|l| l as usize).collect())
    }

    /// The fitted trees are not `Clone`, so the snapshot goes through JSON
    fn export(&self) -> Option<EstimatorParams> {
        self.forest.as_ref()?;
        let snapshot = serde_json::to_value(self).ok()?;
        serde_json::from_value(snapshot)
            .ok()
            .map(EstimatorParams::RandomForest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_blobs() -> (Vec<Vec<f32>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for label in 0..3 {
            for i in 0..8 {
                let base = label as f32 * 4.0;
                x.push(vec![base + i as f32 * 0.05, base - i as f32 * 0.03, (i % 2) as f32]);
                y.push(label);
            }
        }
        (x, y)
    }

    #[test]
    fn test_separates_blobs() {
        let (x, y) = three_blobs();
        let mut forest = RandomForest::new(25, 7);
        forest.fit(&x, &y).unwrap();
        let pred = forest
            .predict(&[vec![0.1, 0.0, 0.0], vec![4.1, 3.9, 1.0], vec![8.2, 7.9, 0.0]])
            .unwrap();
        assert_eq!(pred, vec![0, 1, 2]);
    }

    #[test]
    fn test_same_seed_same_trees() {
        let (x, y) = three_blobs();
        let mut a = RandomForest::new(10, 3);
        let mut b = RandomForest::new(10, 3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_export_restores_predictions() {
        let (x, y) = three_blobs();
        let mut forest = RandomForest::new(10, 1);
        forest.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&forest.export().unwrap()).unwrap();
        assert!(json.contains(r#""kind":"random_forest""#));
        let restored: EstimatorParams = serde_json::from_str(&json).unwrap();
        let restored = restored.into_estimator();
        assert_eq!(restored.predict(&x).unwrap(), forest.predict(&x).unwrap());
    }

    #[test]
    fn test_errors() {
        let forest = RandomForest::default();
        assert_eq!(forest.predict(&[vec![1.0]]), Err(ModelError::NotFitted));
        assert!(forest.export().is_none());

        let mut forest = RandomForest::new(0, 0);
        assert!(matches!(
            forest.fit(&[vec![1.0]], &[0]),
            Err(ModelError::InvalidParameter(_))
        ));
    }
}
