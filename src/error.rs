// src/error.rs
//
// Error taxonomy for the classification pipeline.
//
// Per-file and per-sample errors (decode, extraction, augmentation) are local:
// the orchestrator logs them and moves on. Per-class and per-run errors are the
// only ones allowed to abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// A single file could not be turned into a mono waveform.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized or corrupt container: {0}")]
    Container(String),

    #[error("no supported audio track found")]
    NoTrack,

    #[error("stream does not specify a sample rate")]
    MissingSampleRate,

    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("no audio samples decoded")]
    Empty,

    #[error("resampling {from} Hz -> {to} Hz failed: {reason}")]
    Resample { from: u32, to: u32, reason: String },

    #[error("decode exceeded {0:.1}s budget")]
    TimedOut(f64),

    #[error("decode cancelled")]
    Cancelled,
}

/// A decoded waveform could not produce a valid feature vector.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureExtractionError {
    #[error("waveform is empty")]
    Empty,

    #[error("waveform contains NaN or infinite samples")]
    NonFinite,

    #[error("waveform is silent (rms {rms:.2e} below floor {floor:.2e})")]
    Silent { rms: f32, floor: f32 },

    #[error("waveform too short: {frames} frames, need at least {required}")]
    TooShort { frames: usize, required: usize },

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// One augmentation variant could not be synthesized.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AugmentError {
    #[error("input waveform is empty")]
    EmptyInput,

    #[error("resampling failed: {0}")]
    Resample(String),
}

/// A class could not be filled up to the majority target.
#[derive(Debug, Error, Clone, PartialEq)]
#[error(
    "class '{class}' (label {label}) reached only {reached}/{target} examples after {passes} augmentation passes"
)]
pub struct AugmentationExhaustionError {
    pub class: String,
    pub label: usize,
    pub reached: usize,
    pub target: usize,
    pub passes: usize,
}

/// Fatal: the corpus cannot produce a dataset.
#[derive(Debug, Error)]
pub enum DatasetEmptyError {
    #[error("class folder for '{class}' not found at {path}")]
    MissingClassDir { class: String, path: PathBuf },

    #[error("class folder '{class}' contains no audio files")]
    NoAudioFiles { class: String },

    #[error("class '{class}' yielded no usable examples")]
    NoUsableFiles { class: String },

    #[error("no class has any audio files, majority class is undefined")]
    NoMajority,

    #[error("failed to read class folder {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Estimator-level failure (fit or predict).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("estimator has not been fitted")]
    NotFitted,

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("feature/label count mismatch: {features} rows, {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid hyperparameter: {0}")]
    InvalidParameter(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// A single harness configuration failed; the others keep running.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelTrainingError {
    #[error("scaler failed: {0}")]
    Scaler(ModelError),

    #[error("fit failed: {0}")]
    Fit(ModelError),

    #[error("predict failed: {0}")]
    Predict(ModelError),

    #[error("estimator panicked: {0}")]
    Panicked(String),
}

/// The dataset cannot be partitioned into train/test sets.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplitError {
    #[error("dataset is empty")]
    Empty,

    #[error("test fraction {0} must lie strictly between 0 and 1")]
    InvalidFraction(f64),

    #[error("class {label} has {count} example(s), stratified split needs at least 2")]
    ClassTooSmall { label: usize, count: usize },
}

/// Reading or writing a persisted model failed.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported bundle format version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("bundle feature dimension {found} does not match extractor dimension {expected}")]
    FeatureDim { found: usize, expected: usize },

    #[error("bundle has an empty or invalid class list")]
    ClassList,

    #[error("model '{0}' cannot be exported")]
    NotExportable(String),
}

/// Invalid pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Run-aborting errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    DatasetEmpty(#[from] DatasetEmptyError),

    #[error(transparent)]
    Exhausted(#[from] AugmentationExhaustionError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid class list: {0}")]
    ClassList(String),
}
