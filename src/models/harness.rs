// src/models/harness.rs
//
// Trains every configured model on one shared stratified split, in parallel,
// and reports test accuracy per model. A failing or panicking model is
// recorded and never takes the rest of the run down with it.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{info, warn};
use rayon::prelude::*;

use super::centroid::NearestCentroid;
use super::estimator::{validate_rows, Estimator};
use super::forest::RandomForest;
use super::knn::{KNearestNeighbors, DEFAULT_K};
use super::logistic::LogisticRegression;
use super::mlp::MultilayerPerceptron;
use super::naive_bayes::GaussianNaiveBayes;
use super::svm::SupportVectorMachine;
use super::scaler::StandardScaler;
use super::split::StratifiedSplit;
use crate::config::SplitConfig;
use crate::dataset::{ClassLabels, Dataset};
use crate::error::{ModelError, ModelTrainingError, SplitError};

/// One entry of the model bank: an unfitted estimator and an optional
/// unfitted scaler placed in front of it
pub struct ModelConfig {
    pub name: String,
    pub estimator: Box<dyn Estimator>,
    pub scaler: Option<StandardScaler>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, estimator: impl Estimator + 'static) -> Self {
        Self {
            name: name.into(),
            estimator: Box::new(estimator),
            scaler: None,
        }
    }

    /// Standardize features before the estimator sees them
    pub fn scaled(mut self) -> Self {
        self.scaler = Some(StandardScaler::new());
        self
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("name", &self.name)
            .field("estimator", &self.estimator.kind())
            .field("scaled", &self.scaler.is_some())
            .finish()
    }
}

/// The stock bank. Tree ensembles and naive Bayes see raw features; the
/// margin, distance and gradient-trained models sit behind a scaler.
pub fn default_model_bank() -> Vec<ModelConfig> {
    vec![
        ModelConfig::new("Random Forest", RandomForest::default()),
        ModelConfig::new("SVM (RBF)", SupportVectorMachine::default()).scaled(),
        ModelConfig::new("Logistic Regression", LogisticRegression::new()).scaled(),
        ModelConfig::new("k-NN", KNearestNeighbors::new(DEFAULT_K)).scaled(),
        ModelConfig::new("Naive Bayes", GaussianNaiveBayes::default()),
        ModelConfig::new("MLP", MultilayerPerceptron::default()).scaled(),
        ModelConfig::new("Nearest Centroid", NearestCentroid::new()).scaled(),
    ]
}

/// A fitted (scaler, estimator) pair bound to its label names
pub struct TrainedModel {
    name: String,
    estimator: Box<dyn Estimator>,
    scaler: Option<StandardScaler>,
    classes: ClassLabels,
    feature_dim: usize,
}

impl TrainedModel {
    pub(crate) fn new(
        name: String,
        estimator: Box<dyn Estimator>,
        scaler: Option<StandardScaler>,
        classes: ClassLabels,
        feature_dim: usize,
    ) -> Self {
        Self {
            name,
            estimator,
            scaler,
            classes,
            feature_dim,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn classes(&self) -> &ClassLabels {
        &self.classes
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Predict the label index for one raw (unscaled) feature row
    pub fn predict_row(&self, row: &[f32]) -> Result<usize, ModelError> {
        let rows = vec![row.to_vec()];
        validate_rows(&rows, self.feature_dim)?;
        let rows = match &self.scaler {
            Some(scaler) => scaler.transform(&rows)?,
            None => rows,
        };
        let label = self
            .estimator
            .predict(&rows)?
            .first()
            .copied()
            .ok_or_else(|| ModelError::Numerical("estimator returned no prediction".into()))?;
        if label >= self.classes.len() {
            return Err(ModelError::Numerical(format!(
                "predicted label {} outside {} classes",
                label,
                self.classes.len()
            )));
        }
        Ok(label)
    }

    /// Predict the class name for one raw feature row
    pub fn predict_name(&self, row: &[f32]) -> Result<&str, ModelError> {
        let label = self.predict_row(row)?;
        self.classes
            .name(label)
            .ok_or_else(|| ModelError::Numerical(format!("no name for label {}", label)))
    }
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("name", &self.name)
            .field("estimator", &self.estimator.kind())
            .field("scaled", &self.scaler.is_some())
            .field("classes", &self.classes.names())
            .field("feature_dim", &self.feature_dim)
            .finish()
    }
}

#[derive(Debug)]
pub struct EvaluatedModel {
    pub model: TrainedModel,
    /// Fraction of held-out rows predicted correctly
    pub accuracy: f64,
}

#[derive(Debug)]
pub struct ModelOutcome {
    pub name: String,
    pub result: Result<EvaluatedModel, ModelTrainingError>,
}

/// Results for every configuration, in configuration order
#[derive(Debug)]
pub struct TrainingReport {
    pub outcomes: Vec<ModelOutcome>,
    pub train_size: usize,
    pub test_size: usize,
}

impl TrainingReport {
    /// Successful models, best accuracy first. Ties keep configuration order.
    pub fn ranked(&self) -> Vec<&EvaluatedModel> {
        let mut ok: Vec<&EvaluatedModel> = self
            .outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect();
        ok.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
        ok
    }

    pub fn best(&self) -> Option<&EvaluatedModel> {
        self.ranked().into_iter().next()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ModelTrainingError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
    }

    /// Consume the report, keeping only the best model
    pub fn into_best(self) -> Option<EvaluatedModel> {
        let mut best: Option<EvaluatedModel> = None;
        for outcome in self.outcomes {
            if let Ok(candidate) = outcome.result {
                if best.as_ref().map_or(true, |b| candidate.accuracy > b.accuracy) {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}

/// Fits the model bank against one stratified split
#[derive(Debug, Clone, Default)]
pub struct TrainingHarness {
    split: SplitConfig,
}

impl TrainingHarness {
    pub fn new(split: SplitConfig) -> Self {
        Self { split }
    }

    pub fn run(
        &self,
        dataset: &Dataset,
        configs: Vec<ModelConfig>,
    ) -> Result<TrainingReport, SplitError> {
        let labels = dataset.labels();
        let split = StratifiedSplit::new(&labels, &self.split)?;

        let rows = dataset.features();
        let gather = |idx: &[usize]| -> (Vec<Vec<f32>>, Vec<usize>) {
            idx.iter().map(|&i| (rows[i].to_vec(), labels[i])).unzip()
        };
        let (train_x, train_y) = gather(&split.train);
        let (test_x, test_y) = gather(&split.test);
        let data = SplitData {
            train_x: &train_x,
            train_y: &train_y,
            test_x: &test_x,
            test_y: &test_y,
            classes: dataset.classes(),
        };

        info!(
            "Training {} model(s) on {} rows, evaluating on {}",
            configs.len(),
            train_x.len(),
            test_x.len()
        );

        let outcomes = configs
            .into_par_iter()
            .map(|config| {
                let name = config.name.clone();
                let result = catch_unwind(AssertUnwindSafe(|| train_one(config, &data)))
                    .unwrap_or_else(|payload| {
                        Err(ModelTrainingError::Panicked(panic_message(payload)))
                    });
                match &result {
                    Ok(evaluated) => info!("{}: accuracy {:.4}", name, evaluated.accuracy),
                    Err(e) => warn!("{}: {}", name, e),
                }
                ModelOutcome { name, result }
            })
            .collect();

        Ok(TrainingReport {
            outcomes,
            train_size: split.train.len(),
            test_size: split.test.len(),
        })
    }
}

struct SplitData<'a> {
    train_x: &'a [Vec<f32>],
    train_y: &'a [usize],
    test_x: &'a [Vec<f32>],
    test_y: &'a [usize],
    classes: &'a ClassLabels,
}

fn train_one(config: ModelConfig, data: &SplitData<'_>) -> Result<EvaluatedModel, ModelTrainingError> {
    let ModelConfig {
        name,
        mut estimator,
        mut scaler,
    } = config;

    // The scaler sees training rows only
    let (train_x, test_x) = match scaler.as_mut() {
        Some(s) => {
            s.fit(data.train_x).map_err(ModelTrainingError::Scaler)?;
            (
                s.transform(data.train_x).map_err(ModelTrainingError::Scaler)?,
                s.transform(data.test_x).map_err(ModelTrainingError::Scaler)?,
            )
        }
        None => (data.train_x.to_vec(), data.test_x.to_vec()),
    };

    estimator
        .fit(&train_x, data.train_y)
        .map_err(ModelTrainingError::Fit)?;
    let predicted = estimator
        .predict(&test_x)
        .map_err(ModelTrainingError::Predict)?;
    if predicted.len() != data.test_y.len() {
        return Err(ModelTrainingError::Predict(ModelError::LengthMismatch {
            features: data.test_y.len(),
            labels: predicted.len(),
        }));
    }

    let correct = predicted
        .iter()
        .zip(data.test_y)
        .filter(|(p, t)| p == t)
        .count();
    let accuracy = correct as f64 / data.test_y.len().max(1) as f64;
    let feature_dim = train_x.first().map_or(0, Vec::len);

    Ok(EvaluatedModel {
        model: TrainedModel::new(name, estimator, scaler, data.classes.clone(), feature_dim),
        accuracy,
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
