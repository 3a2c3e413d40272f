// src/config/pipeline.rs
//
// Pipeline configuration: decoding, extraction, augmentation, balancing and
// splitting parameters. Every field has a default so a partial JSON file is
// enough to override a single knob.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Audio file extensions picked up when enumerating class folders
pub const DEFAULT_EXTENSIONS: [&str; 5] = ["wav", "mp3", "m4a", "ogg", "flac"];

/// Decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Resample every file to this rate (None keeps the native rate)
    pub target_sample_rate: Option<u32>,
    /// Wall-clock budget for decoding one file, in seconds (None disables).
    /// On expiry the file is reported as timed out and its worker thread is
    /// signalled to stop at the next packet boundary; a read already blocked
    /// inside the container parser keeps the thread alive until it returns.
    pub timeout_secs: Option<u64>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: Some(22_050),
            timeout_secs: Some(30),
        }
    }
}

/// STFT / mel parameters for feature extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    /// Waveforms with RMS below this are rejected as silent
    pub silence_floor: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            silence_floor: 1e-6,
        }
    }
}

/// Random augmentation ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Pitch shift is drawn from [-pitch_semitones, +pitch_semitones]
    pub pitch_semitones: f32,
    pub stretch_min: f32,
    pub stretch_max: f32,
    /// Standard deviation of the additive Gaussian noise
    pub noise_scale: f32,
    /// Fixed seed for reproducible runs (None draws from OS entropy)
    pub seed: Option<u64>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            pitch_semitones: 2.0,
            stretch_min: 0.9,
            stretch_max: 1.1,
            noise_scale: 0.005,
            seed: None,
        }
    }
}

/// What to do when a class cannot be filled to the majority target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Fail the run with the exhaustion error
    #[default]
    Abort,
    /// Keep the partially filled class and report the shortfall
    Continue,
}

/// Class balancing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Upper bound on full cyclic passes over a class's file list
    pub max_passes: usize,
    pub on_exhaustion: ExhaustionPolicy,
    pub extensions: Vec<String>,
    pub show_progress: bool,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            max_passes: 10,
            on_exhaustion: ExhaustionPolicy::Abort,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            show_progress: false,
        }
    }
}

/// Train/test split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub decode: DecodeConfig,
    pub extraction: ExtractionConfig,
    pub augment: AugmentConfig,
    pub balance: BalanceConfig,
    pub split: SplitConfig,
}

impl PipelineConfig {
    /// Load a JSON config file; missing fields fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ex = &self.extraction;
        if ex.n_fft < 16 {
            return Err(invalid("extraction.n_fft", format!("{} is too small", ex.n_fft)));
        }
        if ex.hop_length == 0 || ex.hop_length > ex.n_fft {
            return Err(invalid(
                "extraction.hop_length",
                format!("must be in 1..={}", ex.n_fft),
            ));
        }
        if ex.n_mels < crate::core::features::N_MFCC {
            return Err(invalid(
                "extraction.n_mels",
                format!("need at least {} mel bands", crate::core::features::N_MFCC),
            ));
        }
        if !(ex.silence_floor >= 0.0) {
            return Err(invalid("extraction.silence_floor", "must be >= 0".into()));
        }

        let aug = &self.augment;
        if !(aug.pitch_semitones >= 0.0 && aug.pitch_semitones <= 12.0) {
            return Err(invalid("augment.pitch_semitones", "must be in 0..=12".into()));
        }
        if !(aug.stretch_min > 0.0 && aug.stretch_min <= aug.stretch_max && aug.stretch_max <= 4.0) {
            return Err(invalid(
                "augment.stretch_min/stretch_max",
                format!("need 0 < min <= max <= 4, got {}..{}", aug.stretch_min, aug.stretch_max),
            ));
        }
        if !(aug.noise_scale >= 0.0) {
            return Err(invalid("augment.noise_scale", "must be >= 0".into()));
        }

        if self.balance.max_passes == 0 {
            return Err(invalid("balance.max_passes", "must be at least 1".into()));
        }
        if self.balance.extensions.is_empty() {
            return Err(invalid("balance.extensions", "no audio extensions configured".into()));
        }

        let f = self.split.test_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(invalid("split.test_fraction", format!("{} not in (0, 1)", f)));
        }

        if self.decode.target_sample_rate == Some(0) {
            return Err(invalid("decode.target_sample_rate", "must be non-zero".into()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Fluent builder over [`PipelineConfig`]
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn target_sample_rate(mut self, rate: Option<u32>) -> Self {
        self.config.decode.target_sample_rate = rate;
        self
    }

    pub fn decode_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.decode.timeout_secs = secs;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.augment.seed = Some(seed);
        self
    }

    pub fn max_passes(mut self, passes: usize) -> Self {
        self.config.balance.max_passes = passes;
        self
    }

    pub fn on_exhaustion(mut self, policy: ExhaustionPolicy) -> Self {
        self.config.balance.on_exhaustion = policy;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.balance.show_progress = show;
        self
    }

    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.config.split.test_fraction = fraction;
        self
    }

    pub fn split_seed(mut self, seed: u64) -> Self {
        self.config.split.seed = seed;
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
