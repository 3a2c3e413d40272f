//! Classical classifiers, the training harness and model persistence
//!
//! - `estimator` - the [`Estimator`] trait and serializable parameters
//! - `scaler` - per-feature standardization fitted on training rows only
//! - `knn`, `naive_bayes`, `logistic`, `centroid` - built-in estimators
//! - `forest`, `svm` - smartcore-backed random forest and RBF SVM
//! - `mlp` - candle-trained multilayer perceptron
//! - `split` - stratified train/test split
//! - `harness` - parallel, fault-isolated training and evaluation
//! - `bundle` - JSON model bundles

mod bundle;
mod centroid;
mod estimator;
mod forest;
mod harness;
mod knn;
mod logistic;
mod mlp;
mod naive_bayes;
mod scaler;
mod split;
mod svm;

pub use bundle::{
    bundle_file_name, default_model_dir, ModelBundle, BUNDLE_EXTENSION, BUNDLE_FORMAT_VERSION,
};
pub use centroid::NearestCentroid;
pub use estimator::{validate_rows, validate_training, Estimator, EstimatorParams};
pub use forest::{RandomForest, DEFAULT_FOREST_SEED, DEFAULT_TREES};
pub use harness::{
    default_model_bank, EvaluatedModel, ModelConfig, ModelOutcome, TrainedModel, TrainingHarness,
    TrainingReport,
};
pub use knn::{KNearestNeighbors, DEFAULT_K};
pub use logistic::LogisticRegression;
pub use mlp::{MultilayerPerceptron, DEFAULT_HIDDEN, DEFAULT_MLP_MAX_ITER, DEFAULT_MLP_SEED};
pub use naive_bayes::{GaussianNaiveBayes, DEFAULT_VAR_SMOOTHING};
pub use scaler::StandardScaler;
pub use split::StratifiedSplit;
pub use svm::{SupportVectorMachine, DEFAULT_C, DEFAULT_SVM_SEED};
