// src/models/estimator.rs
//
// The fit/predict contract every classifier in the harness satisfies.

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::centroid::NearestCentroid;
use super::forest::RandomForest;
use super::knn::KNearestNeighbors;
use super::logistic::LogisticRegression;
use super::mlp::MultilayerPerceptron;
use super::naive_bayes::GaussianNaiveBayes;
use super::svm::SupportVectorMachine;
use crate::error::ModelError;

/// A classifier over dense `f32` rows with integer labels
pub trait Estimator: Send + Sync {
    /// Short family name, e.g. `"knn"`
    fn kind(&self) -> &'static str;

    fn fit(&mut self, x: &[Vec<f32>], y: &[usize]) -> Result<(), ModelError>;

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<usize>, ModelError>;

    /// Serializable snapshot of the fitted state, if this estimator supports it
    fn export(&self) -> Option<EstimatorParams> {
        None
    }
}

/// Persistable state of the built-in estimators
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorParams {
    Knn(KNearestNeighbors),
    GaussianNb(GaussianNaiveBayes),
    Logistic(LogisticRegression),
    NearestCentroid(NearestCentroid),
    RandomForest(RandomForest),
    Svm(SupportVectorMachine),
    Mlp(MultilayerPerceptron),
}

impl EstimatorParams {
    pub fn into_estimator(self) -> Box<dyn Estimator> {
        match self {
            EstimatorParams::Knn(m) => Box::new(m),
            EstimatorParams::GaussianNb(m) => Box::new(m),
            EstimatorParams::Logistic(m) => Box::new(m),
            EstimatorParams::NearestCentroid(m) => Box::new(m),
            EstimatorParams::RandomForest(m) => Box::new(m),
            EstimatorParams::Svm(m) => Box::new(m),
            EstimatorParams::Mlp(m) => Box::new(m),
        }
    }
}

/// Check a training set is non-empty, rectangular, finite and consistent.
/// Returns the feature dimension.
pub fn validate_training(x: &[Vec<f32>], y: &[usize]) -> Result<usize, ModelError> {
    if !x.is_empty() && x.len() != y.len() {
        return Err(ModelError::LengthMismatch {
            features: x.len(),
            labels: y.len(),
        });
    }
    validate_matrix(x)
}

/// Non-empty, rectangular and finite. Returns the feature dimension.
pub fn validate_matrix(x: &[Vec<f32>]) -> Result<usize, ModelError> {
    if x.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    let dim = x[0].len();
    if dim == 0 {
        return Err(ModelError::DimensionMismatch {
            expected: 1,
            actual: 0,
        });
    }
    validate_rows(x, dim)?;
    Ok(dim)
}

/// Check every row has `dim` finite values
pub fn validate_rows(x: &[Vec<f32>], dim: usize) -> Result<(), ModelError> {
    for row in x {
        if row.len() != dim {
            return Err(ModelError::DimensionMismatch {
                expected: dim,
                actual: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Numerical("non-finite feature value".into()));
        }
    }
    Ok(())
}

pub(crate) fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Widen validated rows into a smartcore matrix
pub(crate) fn dense_matrix(x: &[Vec<f32>]) -> Result<DenseMatrix<f64>, ModelError> {
    let rows: Vec<Vec<f64>> = x
        .iter()
        .map(|row| row.iter().map(|&v| v as f64).collect())
        .collect();
    DenseMatrix::from_2d_vec(&rows).map_err(backend_error)
}

pub(crate) fn backend_error(e: impl std::fmt::Display) -> ModelError {
    ModelError::Numerical(e.to_string())
}
