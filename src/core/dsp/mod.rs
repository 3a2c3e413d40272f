//! Digital Signal Processing utilities
//!
//! - `stft` - centered short-time Fourier transform and its inverse
//! - `mel` - Slaney mel filterbank, dB compression, DCT-II
//! - `stats` - per-band aggregation and delta trajectories
//! - `resample` - rubato-backed sample rate conversion
//! - `stretch` - phase-vocoder time stretch and pitch shift

pub mod mel;
pub mod resample;
pub mod stats;
pub mod stft;
pub mod stretch;
pub mod windows;

pub use mel::{power_to_db, Dct, MelFilterbank};
pub use resample::{resample, resample_ratio};
pub use stats::{column_max, column_mean, column_std, delta, rms, DeltaOrder};
pub use stft::{SpectrumFrame, Stft};
pub use stretch::{phase_vocoder, pitch_shift, time_stretch};
pub use windows::hann_window;
