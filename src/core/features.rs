// src/core/features.rs
//
// Fixed-length MFCC summary features.
//
// Layout of the 200-dim vector (N_MFCC = 40 coefficients):
//   [0..40)    mean of each coefficient over time
//   [40..80)   standard deviation
//   [80..120)  maximum
//   [120..160) mean of the first-order delta
//   [160..200) mean of the second-order delta
//
// Derivatives only contribute their means; the base coefficients carry the
// richer statistics. Keep this layout stable: persisted models depend on it.

use serde::{Deserialize, Serialize};

use super::decoder::AudioSample;
use super::dsp::{self, Dct, DeltaOrder, MelFilterbank, Stft};
use crate::config::ExtractionConfig;
use crate::error::FeatureExtractionError;

/// Number of cepstral coefficients kept per frame
pub const N_MFCC: usize = 40;

/// Length of every feature vector
pub const FEATURE_DIM: usize = 5 * N_MFCC;

/// Frames spanned by the delta regression window; also the minimum usable length
pub const DELTA_WIDTH: usize = 9;

const AMIN: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

/// A fixed-length summary of one waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = String;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        if values.len() != FEATURE_DIM {
            return Err(format!(
                "feature vector must have {} values, got {}",
                FEATURE_DIM,
                values.len()
            ));
        }
        Ok(Self(values))
    }
}

impl From<FeatureVector> for Vec<f32> {
    fn from(vector: FeatureVector) -> Self {
        vector.0
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Cepstral feature extractor
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: ExtractionConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the summary vector from a decoded sample
    pub fn extract(&self, audio: &AudioSample) -> Result<FeatureVector, FeatureExtractionError> {
        self.extract_samples(&audio.samples, audio.sample_rate)
    }

    /// Extract the summary vector from raw mono samples
    pub fn extract_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<FeatureVector, FeatureExtractionError> {
        let mfcc = self.mfcc(samples, sample_rate)?;
        let d1 = dsp::delta(&mfcc, DELTA_WIDTH, DeltaOrder::First);
        let d2 = dsp::delta(&mfcc, DELTA_WIDTH, DeltaOrder::Second);

        let mut values = Vec::with_capacity(FEATURE_DIM);
        values.extend(dsp::column_mean(&mfcc));
        values.extend(dsp::column_std(&mfcc));
        values.extend(dsp::column_max(&mfcc));
        values.extend(dsp::column_mean(&d1));
        values.extend(dsp::column_mean(&d2));

        if values.iter().any(|v| !v.is_finite()) {
            return Err(FeatureExtractionError::NonFinite);
        }
        FeatureVector::try_from(values).map_err(|_| FeatureExtractionError::TooShort {
            frames: mfcc.len(),
            required: DELTA_WIDTH,
        })
    }

    /// MFCC matrix indexed `[frame][coefficient]`
    pub fn mfcc(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<Vec<f32>>, FeatureExtractionError> {
        self.validate(samples, sample_rate)?;

        let cfg = &self.config;
        let stft = Stft::new(cfg.n_fft, cfg.hop_length);
        let filterbank = MelFilterbank::new(sample_rate, cfg.n_fft, cfg.n_mels);

        let mut mel: Vec<Vec<f32>> = stft
            .power(samples)
            .iter()
            .map(|frame| filterbank.apply(frame))
            .collect();
        dsp::power_to_db(&mut mel, AMIN, TOP_DB);

        let dct = Dct::new(cfg.n_mels, N_MFCC);
        Ok(mel.iter().map(|frame| dct.apply(frame)).collect())
    }

    fn validate(&self, samples: &[f32], sample_rate: u32) -> Result<(), FeatureExtractionError> {
        if sample_rate == 0 {
            return Err(FeatureExtractionError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(FeatureExtractionError::Empty);
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(FeatureExtractionError::NonFinite);
        }

        let frames = 1 + samples.len() / self.config.hop_length;
        if frames < DELTA_WIDTH {
            return Err(FeatureExtractionError::TooShort {
                frames,
                required: DELTA_WIDTH,
            });
        }

        let rms = dsp::rms(samples);
        if rms < self.config.silence_floor {
            return Err(FeatureExtractionError::Silent {
                rms,
                floor: self.config.silence_floor,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn chirp(sample_rate: u32, secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * secs) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.4 * (2.0 * PI * (300.0 + 400.0 * t) * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_dimension_independent_of_duration_and_rate() {
        let extractor = FeatureExtractor::default();
        for (rate, secs) in [(22_050, 0.5), (22_050, 3.0), (16_000, 1.0), (44_100, 0.25)] {
            let features = extractor.extract_samples(&chirp(rate, secs), rate).unwrap();
            assert_eq!(features.len(), FEATURE_DIM, "rate {} secs {}", rate, secs);
            assert!(features.as_slice().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let extractor = FeatureExtractor::default();
        assert_eq!(
            extractor.extract_samples(&[], 22_050),
            Err(FeatureExtractionError::Empty)
        );
        assert!(matches!(
            extractor.extract_samples(&vec![0.0; 22_050], 22_050),
            Err(FeatureExtractionError::Silent { .. })
        ));
        assert!(matches!(
            extractor.extract_samples(&vec![0.3; 1000], 22_050),
            Err(FeatureExtractionError::TooShort { frames: 2, required: DELTA_WIDTH })
        ));
        let mut bad = chirp(22_050, 1.0);
        bad[100] = f32::NAN;
        assert_eq!(
            extractor.extract_samples(&bad, 22_050),
            Err(FeatureExtractionError::NonFinite)
        );
        assert_eq!(
            extractor.extract_samples(&chirp(22_050, 1.0), 0),
            Err(FeatureExtractionError::InvalidSampleRate(0))
        );
    }

    #[test]
    fn test_layout_blocks() {
        let extractor = FeatureExtractor::default();
        let samples = chirp(22_050, 1.0);
        let mfcc = extractor.mfcc(&samples, 22_050).unwrap();
        let features = extractor.extract_samples(&samples, 22_050).unwrap();
        let v = features.as_slice();

        assert_eq!(&v[..N_MFCC], dsp::column_mean(&mfcc).as_slice());
        assert_eq!(&v[2 * N_MFCC..3 * N_MFCC], dsp::column_max(&mfcc).as_slice());
        // max >= mean and std >= 0 band by band
        for k in 0..N_MFCC {
            assert!(v[2 * N_MFCC + k] >= v[k] - 1e-4);
            assert!(v[N_MFCC + k] >= 0.0);
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::default();
        let samples = chirp(22_050, 0.8);
        let a = extractor.extract_samples(&samples, 22_050).unwrap();
        let b = extractor.extract_samples(&samples, 22_050).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_feature_vector_rejects_wrong_length() {
        assert!(FeatureVector::try_from(vec![0.0; FEATURE_DIM - 1]).is_err());
        assert!(FeatureVector::try_from(vec![0.0; FEATURE_DIM]).is_ok());
    }
}
