// src/core/decoder.rs
//
// Audio decoding to an in-memory mono waveform.
// Uses Symphonia for format-agnostic decoding and rubato for rate conversion;
// nothing is ever written next to the source file.

use log::debug;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::dsp::resample::resample;
use crate::config::DecodeConfig;
use crate::error::DecodeError;

/// A decoded mono waveform
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    /// Mono samples, nominally in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioSample {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Raw interleaved output of the container decoder
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: usize,
    /// Original codec name
    pub codec_name: String,
}

/// Turns a file path into a mono waveform
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<AudioSample, DecodeError>;
}

/// Decoder backed by Symphonia with optional resampling and a time budget
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    config: DecodeConfig,
}

impl SymphoniaDecoder {
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    fn decode_now(
        path: &Path,
        target_rate: Option<u32>,
        cancel: &AtomicBool,
    ) -> Result<AudioSample, DecodeError> {
        let audio = decode_audio_until(path, cancel)?;
        if cancel.load(Ordering::Relaxed) {
            return Err(DecodeError::Cancelled);
        }
        let mono = extract_mono(&audio);
        match target_rate {
            Some(rate) if rate != audio.sample_rate => {
                let samples = resample(&mono, audio.sample_rate, rate).map_err(|reason| {
                    DecodeError::Resample {
                        from: audio.sample_rate,
                        to: rate,
                        reason,
                    }
                })?;
                Ok(AudioSample::new(samples, rate))
            }
            _ => Ok(AudioSample::new(mono, audio.sample_rate)),
        }
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<AudioSample, DecodeError> {
        let target = self.config.target_sample_rate;
        let Some(secs) = self.config.timeout_secs else {
            return Self::decode_now(path, target, &AtomicBool::new(false));
        };

        // The worker is detached. On expiry it is told to stop and quits at
        // its next packet; a single blocking read inside Symphonia cannot be
        // interrupted and runs to completion first.
        let owned: PathBuf = path.to_path_buf();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(Self::decode_now(&owned, target, &worker_cancel));
        });

        let budget = Duration::from_secs(secs);
        match rx.recv_timeout(budget) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                cancel.store(true, Ordering::Relaxed);
                debug!("Decode of {} timed out, worker cancelled", path.display());
                Err(DecodeError::TimedOut(budget.as_secs_f64()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(DecodeError::Decode("decoder worker exited unexpectedly".into()))
            }
        }
    }
}

/// Decode audio file to interleaved floating-point samples
pub fn decode_audio(path: &Path) -> Result<AudioData, DecodeError> {
    decode_audio_until(path, &AtomicBool::new(false))
}

/// Like [`decode_audio`], but stops with [`DecodeError::Cancelled`] once
/// `cancel` is set. The flag is checked before every packet.
pub fn decode_audio_until(path: &Path, cancel: &AtomicBool) -> Result<AudioData, DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(ext.to_str().unwrap_or(""));
    }

    let meta_opts = MetadataOptions::default();
    let fmt_opts = FormatOptions::default();

    let mut opened = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| DecodeError::Container(e.to_string()))?;

    let track = opened
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::MissingSampleRate)?;
    let codec_name = format!("{:?}", track.codec_params.codec);

    let dec_opts = DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .map_err(|e| DecodeError::UnsupportedCodec(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(DecodeError::Cancelled);
        }
        let packet = match opened.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(DecodeError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("Skipping corrupt packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(DecodeError::Decode(e.to_string())),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err(DecodeError::Empty);
    }

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        codec_name,
    })
}

/// Average all channels down to mono
pub fn extract_mono(audio: &AudioData) -> Vec<f32> {
    if audio.channels <= 1 {
        return audio.samples.clone();
    }

    audio
        .samples
        .chunks_exact(audio.channels)
        .map(|frame| frame.iter().sum::<f32>() / audio.channels as f32)
        .collect()
}
