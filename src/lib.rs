//! CrySense - Infant cry classification
//!
//! Turns a folder of labeled infant-cry recordings into a class-balanced
//! feature dataset, trains a bank of classical classifiers on it and labels
//! new recordings with the trained models.
//!
//! ## Features
//!
//! - **Fixed-length features**: 200-dim MFCC summary (mean, std and max of 40
//!   coefficients plus mean first and second deltas) for any clip length or
//!   sample rate
//! - **Augmentation**: pitch shift, time stretch and additive noise variants
//! - **Bounded balancing**: minority classes are filled to the majority count
//!   by cycling augmentation, with a hard limit on passes
//! - **Fault-isolated training**: a failing or panicking model is reported
//!   without stopping the others
//! - **Sentinel predictions**: unreadable or degenerate input yields a named
//!   outcome instead of an error
//!
//! ## Module Structure
//!
//! - `core` - decoding, DSP, feature extraction and augmentation
//! - `dataset` - class labels, labeled rows and the balancer
//! - `models` - estimators, scaler, training harness and model bundles
//! - `predict` - single-file inference
//! - `config` - pipeline configuration
//! - `cli` - command-line interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crysense::config::PipelineConfig;
//! use crysense::core::{AudioAugmenter, FeatureExtractor, SymphoniaDecoder};
//! use crysense::dataset::{ClassLabels, DatasetBalancer};
//! use crysense::models::{default_model_bank, TrainingHarness};
//!
//! let config = PipelineConfig::default();
//! let classes = ClassLabels::new(["belly_pain", "burping", "discomfort", "hungry", "tired"])?;
//! let decoder = SymphoniaDecoder::new(config.decode.clone());
//! let extractor = FeatureExtractor::new(config.extraction.clone());
//!
//! let mut balancer = DatasetBalancer::new(
//!     &decoder,
//!     &extractor,
//!     AudioAugmenter::new(config.augment.clone()),
//!     config.balance.clone(),
//! );
//! let balanced = balancer.balance(&classes, root)?;
//!
//! let report = TrainingHarness::new(config.split).run(&balanced.dataset, default_model_bank())?;
//! if let Some(best) = report.best() {
//!     println!("{}: {:.2}", best.model.name(), best.accuracy);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod models;
pub mod predict;

// Re-export commonly used types
pub use config::{PipelineBuilder, PipelineConfig};
pub use self::core::{AudioAugmenter, AudioSample, Decoder, FeatureExtractor, FeatureVector, SymphoniaDecoder};
pub use dataset::{BalancedDataset, ClassLabels, Dataset, DatasetBalancer};
pub use error::PipelineError;
pub use models::{default_model_bank, ModelBundle, TrainedModel, TrainingHarness, TrainingReport};
pub use predict::{Prediction, PredictionService};
