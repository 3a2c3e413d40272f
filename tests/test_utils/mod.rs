// tests/test_utils/mod.rs
//
// Shared helpers for integration tests: synthetic corpora on disk, WAV
// writing and decoders that synthesize audio from file names.

#![allow(dead_code)]

use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use crysense::config::{BalanceConfig, PipelineConfig};
use crysense::core::{AudioSample, Decoder};
use crysense::error::DecodeError;
use tempfile::TempDir;

pub const SR: u32 = 22050;

/// Half a second of a sine tone with a little second-harmonic colour
pub fn tone(freq: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * secs) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.4 * (2.0 * PI * freq * t).sin() + 0.1 * (4.0 * PI * freq * t).sin()
        })
        .collect()
}

/// A corpus root with one folder per class holding empty placeholder files
pub struct Corpus {
    pub dir: TempDir,
    pub classes: Vec<String>,
}

impl Corpus {
    /// `layout` is (class name, file count)
    pub fn placeholder(layout: &[(&str, usize)]) -> Self {
        let dir = tempfile::tempdir().expect("create temp corpus");
        for (class, count) in layout {
            let class_dir = dir.path().join(class);
            fs::create_dir_all(&class_dir).expect("create class dir");
            for i in 0..*count {
                fs::write(class_dir.join(format!("{:03}.wav", i)), b"").expect("write placeholder");
            }
        }
        Self {
            dir,
            classes: layout.iter().map(|(c, _)| c.to_string()).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn class_dir(&self, class: &str) -> PathBuf {
        self.dir.path().join(class)
    }

    /// Add a placeholder file whose name makes [`ToneDecoder`] fail
    pub fn add_broken(&self, class: &str, name: &str) {
        fs::write(self.class_dir(class).join(format!("broken_{}.wav", name)), b"")
            .expect("write broken placeholder");
    }
}

/// Write a 16-bit PCM WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(v).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
}

/// Synthesizes a tone per class folder instead of reading the file.
///
/// The parent folder name picks the base frequency; the file number detunes
/// it slightly. Files whose stem starts with `broken` fail to decode and
/// stems starting with `silent` decode to zeros.
pub struct ToneDecoder {
    pub frequencies: Vec<(String, f32)>,
    pub secs: f32,
}

impl ToneDecoder {
    pub fn new(frequencies: &[(&str, f32)]) -> Self {
        Self {
            frequencies: frequencies.iter().map(|(c, f)| (c.to_string(), *f)).collect(),
            secs: 0.5,
        }
    }
}

impl Decoder for ToneDecoder {
    fn decode(&self, path: &Path) -> Result<AudioSample, DecodeError> {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem.starts_with("broken") {
            return Err(DecodeError::Container(format!("unrecognised container: {}", stem)));
        }
        let n = (SR as f32 * self.secs) as usize;
        if stem.starts_with("silent") {
            return Ok(AudioSample::new(vec![0.0; n], SR));
        }

        let class = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let base = self
            .frequencies
            .iter()
            .find(|(c, _)| c == class)
            .map(|(_, f)| *f)
            .ok_or(DecodeError::NoTrack)?;
        let index: f32 = stem.parse().unwrap_or(0.0);
        Ok(AudioSample::new(tone(base * (1.0 + 0.002 * index), SR, self.secs), SR))
    }
}

/// Every decode fails
pub struct FailingDecoder;

impl Decoder for FailingDecoder {
    fn decode(&self, _path: &Path) -> Result<AudioSample, DecodeError> {
        Err(DecodeError::Empty)
    }
}

/// Default pipeline configuration with a fixed seed and a given pass bound
pub fn seeded_config(max_passes: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.augment.seed = Some(7);
    config.balance = BalanceConfig {
        max_passes,
        ..Default::default()
    };
    config
}
