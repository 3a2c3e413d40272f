// src/core/augment.rs
//
// Synthetic variants for minority-class oversampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

use super::decoder::AudioSample;
use super::dsp::{pitch_shift, time_stretch};
use crate::config::AugmentConfig;
use crate::error::AugmentError;

/// Which transformation produced a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AugmentKind {
    PitchShift,
    TimeStretch,
    Noise,
}

impl AugmentKind {
    /// Variant order produced by [`AudioAugmenter::augment`]
    pub const ALL: [AugmentKind; 3] = [Self::PitchShift, Self::TimeStretch, Self::Noise];

    pub fn name(&self) -> &'static str {
        match self {
            AugmentKind::PitchShift => "pitch_shift",
            AugmentKind::TimeStretch => "time_stretch",
            AugmentKind::Noise => "noise",
        }
    }
}

impl fmt::Display for AugmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One synthesized variant, or the reason it could not be produced
#[derive(Debug, Clone)]
pub struct AugmentedVariant {
    pub kind: AugmentKind,
    /// Random parameter used (semitones, stretch rate, or noise scale)
    pub parameter: f32,
    pub audio: Result<AudioSample, AugmentError>,
}

/// Produces pitch-shifted, time-stretched and noisy copies of a waveform.
///
/// Owns its random source: build it with a seed for reproducible runs.
pub struct AudioAugmenter {
    config: AugmentConfig,
    rng: StdRng,
}

impl AudioAugmenter {
    pub fn new(config: AugmentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Always returns exactly three variants, in [`AugmentKind::ALL`] order.
    /// Each variant is derived from the input independently.
    pub fn augment(&mut self, audio: &AudioSample) -> [AugmentedVariant; 3] {
        let semitones = self.draw_semitones();
        let rate = self.draw_stretch();
        let noise_scale = self.config.noise_scale;

        [
            AugmentedVariant {
                kind: AugmentKind::PitchShift,
                parameter: semitones,
                audio: Self::checked(audio)
                    .and_then(|a| pitch_shift(&a.samples, semitones).map_err(AugmentError::Resample))
                    .map(|s| AudioSample::new(s, audio.sample_rate)),
            },
            AugmentedVariant {
                kind: AugmentKind::TimeStretch,
                parameter: rate,
                audio: Self::checked(audio)
                    .and_then(|a| time_stretch(&a.samples, rate).map_err(AugmentError::Resample))
                    .map(|s| AudioSample::new(s, audio.sample_rate)),
            },
            AugmentedVariant {
                kind: AugmentKind::Noise,
                parameter: noise_scale,
                audio: self.add_noise(audio, noise_scale),
            },
        ]
    }

    fn draw_semitones(&mut self) -> f32 {
        let range = self.config.pitch_semitones;
        if range <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-range..=range)
    }

    fn draw_stretch(&mut self) -> f32 {
        let (lo, hi) = (self.config.stretch_min, self.config.stretch_max);
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    fn add_noise(&mut self, audio: &AudioSample, scale: f32) -> Result<AudioSample, AugmentError> {
        if audio.is_empty() {
            return Err(AugmentError::EmptyInput);
        }
        let rng = &mut self.rng;
        let samples = audio
            .samples
            .iter()
            .map(|&s| s + scale * standard_normal(rng))
            .collect();
        Ok(AudioSample::new(samples, audio.sample_rate))
    }

    fn checked(audio: &AudioSample) -> Result<&AudioSample, AugmentError> {
        if audio.is_empty() {
            return Err(AugmentError::EmptyInput);
        }
        Ok(audio)
    }
}

/// Box-Muller draw from N(0, 1)
fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}
