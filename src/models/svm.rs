// src/models/svm.rs
//
// RBF support vector classifier. smartcore solves each binary problem; the
// multiclass decision is one-vs-one voting over every pair of labels.

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::svm::svc::{SVCParameters, SVC};
use smartcore::svm::{Kernel, Kernels};

use super::estimator::{
    backend_error, dense_matrix, validate_rows, validate_training, Estimator, EstimatorParams,
};
use crate::error::ModelError;

pub const DEFAULT_C: f64 = 1.0;
pub const DEFAULT_SVM_SEED: u64 = 42;

type BinarySvc<'a> = SVC<'a, f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Fitted state of one smartcore binary SVC as it serializes
#[derive(Deserialize)]
struct FittedSvc {
    classes: Option<(i32, i32)>,
    instances: Option<Vec<Vec<f64>>>,
    w: Option<Vec<f64>>,
    b: Option<f64>,
}

/// One pairwise decision function: `bias + sum(coef_i * k(x, sv_i))`,
/// positive means `positive`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PairMachine {
    negative: usize,
    positive: usize,
    support_vectors: Vec<Vec<f64>>,
    coefficients: Vec<f64>,
    bias: f64,
}

impl PairMachine {
    fn from_fitted(svc: &BinarySvc<'_>) -> Result<Self, ModelError> {
        let value = serde_json::to_value(svc).map_err(backend_error)?;
        let fitted: FittedSvc = serde_json::from_value(value).map_err(backend_error)?;
        match fitted {
            FittedSvc {
                classes: Some((negative, positive)),
                instances: Some(support_vectors),
                w: Some(coefficients),
                b: Some(bias),
            } => Ok(Self {
                negative: negative as usize,
                positive: positive as usize,
                support_vectors,
                coefficients,
                bias,
            }),
            _ => Err(ModelError::Numerical("binary SVC returned no solution".into())),
        }
    }

    fn decide(&self, kernel: &Kernels, row: &Vec<f64>) -> Result<usize, ModelError> {
        let mut f = self.bias;
        for (sv, coef) in self.support_vectors.iter().zip(&self.coefficients) {
            f += coef * kernel.apply(row, sv).map_err(backend_error)?;
        }
        Ok(if f > 0.0 { self.positive } else { self.negative })
    }
}

/// `gamma` defaults to `1 / (dim * var(X))` over the training matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportVectorMachine {
    c: f64,
    gamma: Option<f64>,
    seed: u64,
    #[serde(default)]
    fitted_gamma: f64,
    #[serde(default)]
    labels: Vec<usize>,
    #[serde(default)]
    machines: Vec<PairMachine>,
    #[serde(default)]
    dim: usize,
}

impl Default for SupportVectorMachine {
    fn default() -> Self {
        Self::new(DEFAULT_C, None)
    }
}

impl SupportVectorMachine {
    pub fn new(c: f64, gamma: Option<f64>) -> Self {
        Self {
            c,
            gamma,
            seed: DEFAULT_SVM_SEED,
            fitted_gamma: 0.0,
            labels: Vec::new(),
            machines: Vec::new(),
            dim: 0,
        }
    }

    /// Kernel width used by the fitted model
    pub fn gamma(&self) -> f64 {
        self.fitted_gamma
    }

    fn kernel(&self) -> Kernels {
        Kernels::rbf().with_gamma(self.fitted_gamma)
    }

    fn fit_pair(
        &self,
        x: &[Vec<f32>],
        y: &[usize],
        negative: usize,
        positive: usize,
    ) -> Result<PairMachine, ModelError> {
        let (rows, labels): (Vec<Vec<f32>>, Vec<i32>) = x
            .iter()
            .zip(y)
            .filter(|&(_, &l)| l == negative || l == positive)
            .map(|(row, &l)| (row.clone(), l as i32))
            .unzip();
        let matrix = dense_matrix(&rows)?;
        let params = SVCParameters::default()
            .with_c(self.c)
            .with_kernel(self.kernel())
            .with_seed(Some(self.seed));
        let svc: BinarySvc<'_> = SVC::fit(&matrix, &labels, &params).map_err(backend_error)?;
        PairMachine::from_fitted(&svc)
    }

    fn predict_row(&self, row: &[f32]) -> Result<usize, ModelError> {
        let row: Vec<f64> = row.iter().map(|&v| v as f64).collect();
        let kernel = self.kernel();
        let n_labels = self.labels.last().map_or(0, |m| m + 1);
        let mut votes = vec![0usize; n_labels];
        for machine in &self.machines {
            votes[machine.decide(&kernel, &row)?] += 1;
        }

        let mut best = self.labels[0];
        for &label in &self.labels {
            if votes[label] > votes[best] {
                best = label;
            }
        }
        Ok(best)
    }
}

fn scale_gamma(x: &[Vec<f32>], dim: usize) -> f64 {
    let n = (x.len() * dim) as f64;
    let mean = x.iter().flatten().map(|&v| v as f64).sum::<f64>() / n;
    let var = x
        .iter()
        .flatten()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    if var > 0.0 {
        1.0 / (dim as f64 * var)
    } else {
        1.0
    }
}

impl Estimator for SupportVectorMachine {
    fn kind(&self) -> &'static str {
        "svm"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[usize]) -> Result<(), ModelError> {
        if !(self.c > 0.0) {
            return Err(ModelError::InvalidParameter(format!("C must be positive, got {}", self.c)));
        }
        if let Some(g) = self.gamma.filter(|g| !(*g > 0.0)) {
            return Err(ModelError::InvalidParameter(format!("gamma must be positive, got {}", g)));
        }
        let dim = validate_training(x, y)?;

        let mut labels = y.to_vec();
        labels.sort_unstable();
        labels.dedup();

        self.fitted_gamma = self.gamma.unwrap_or_else(|| scale_gamma(x, dim));
        let mut machines = Vec::new();
        for (i, &negative) in labels.iter().enumerate() {
            for &positive in &labels[i + 1..] {
                machines.push(self.fit_pair(x, y, negative, positive)?);
            }
        }

        self.labels = labels;
        self.machines = machines;
        self.dim = dim;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<usize>, ModelError> {
        if self.labels.is_empty() {
            return Err(ModelError::NotFitted);
        }
        validate_rows(x, self.dim)?;
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    fn export(&self) -> Option<EstimatorParams> {
        Some(EstimatorParams::Svm(self.clone()))
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
                let angle = i as f32 * 0.8;
                let base = label as f32 * 3.0;
                x.push(vec![base + 0.3 * angle.cos(), base + 0.3 * angle.sin()]);
                y.push(label);
            }
        }
        (x, y)
    }

    #[test]
    fn test_one_vs_one_separates_blobs() {
        let (x, y) = three_blobs();
        let mut svm = SupportVectorMachine::default();
        svm.fit(&x, &y).unwrap();
        // 3 labels -> 3 pairwise machines
        assert_eq!(svm.machines.len(), 3);
        assert!(svm.gamma() > 0.0);

        let pred = svm
            .predict(&[vec![0.1, -0.1], vec![3.0, 3.2], vec![6.1, 5.9]])
            .unwrap();
        assert_eq!(pred, vec![0, 1, 2]);
    }

    #[test]
    fn test_single_label_predicts_it() {
        let mut svm = SupportVectorMachine::default();
        svm.fit(&[vec![1.0, 2.0], vec![1.5, 2.5]], &[2, 2]).unwrap();
        assert!(svm.machines.is_empty());
        assert_eq!(svm.predict(&[vec![9.0, 9.0]]).unwrap(), vec![2]);
    }

    #[test]
    fn test_scale_gamma() {
        // var of {0, 2, 0, 2} is 1
        let x = vec![vec![0.0, 2.0], vec![0.0, 2.0]];
        assert!((scale_gamma(&x, 2) - 0.5).abs() < 1e-12);
        assert_eq!(scale_gamma(&[vec![3.0, 3.0]], 2), 1.0);
    }

    #[test]
    fn test_errors() {
        let svm = SupportVectorMachine::default();
        assert_eq!(svm.predict(&[vec![1.0]]), Err(ModelError::NotFitted));

        let mut svm = SupportVectorMachine::new(0.0, None);
        assert!(matches!(
            svm.fit(&[vec![1.0]], &[0]),
            Err(ModelError::InvalidParameter(_))
        ));
        let mut svm = SupportVectorMachine::new(1.0, Some(-1.0));
        assert!(matches!(
            svm.fit(&[vec![1.0]], &[0]),
            Err(ModelError::InvalidParameter(_))
        ));
    }
}
