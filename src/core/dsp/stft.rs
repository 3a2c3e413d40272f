//! Short-time Fourier transform with centered framing

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::windows::hann_window;

/// One STFT frame: `n_fft / 2 + 1` complex bins
pub type SpectrumFrame = Vec<Complex32>;

/// Forward/inverse STFT sharing one window and FFT plan pair
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft),
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames a signal of `len` samples produces
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop
    }

    /// Centered STFT: the signal is zero-padded by `n_fft / 2` on both sides so
    /// frame `t` is centered on sample `t * hop`.
    pub fn forward(&self, samples: &[f32]) -> Vec<SpectrumFrame> {
        let pad = self.n_fft / 2;
        let num_frames = self.frame_count(samples.len());
        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex32::new(0.0, 0.0); self.n_fft];

        for frame in 0..num_frames {
            let start = frame * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                // index into the virtual padded signal
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex32::new(sample * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);
            frames.push(buffer[..self.n_bins()].to_vec());
        }

        frames
    }

    /// Power spectrogram `|X|^2`, indexed `[frame][bin]`
    pub fn power(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.forward(samples)
            .into_iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
            .collect()
    }

    /// Inverse of [`Stft::forward`] by weighted overlap-add, trimmed or
    /// zero-padded to exactly `length` samples.
    pub fn inverse(&self, frames: &[SpectrumFrame], length: usize) -> Vec<f32> {
        let pad = self.n_fft / 2;
        let total = self.n_fft + self.hop * frames.len().saturating_sub(1);
        let mut output = vec![0.0f32; total];
        let mut norm = vec![0.0f32; total];
        let mut buffer = vec![Complex32::new(0.0, 0.0); self.n_fft];
        let scale = 1.0 / self.n_fft as f32;

        for (t, frame) in frames.iter().enumerate() {
            // rebuild the full Hermitian spectrum
            for (k, slot) in buffer.iter_mut().enumerate() {
                *slot = if k < frame.len() {
                    frame[k]
                } else {
                    frame[self.n_fft - k].conj()
                };
            }
            buffer[0].im = 0.0;
            if self.n_fft % 2 == 0 {
                buffer[self.n_fft / 2].im = 0.0;
            }
            self.inverse.process(&mut buffer);

            let start = t * self.hop;
            for i in 0..self.n_fft {
                let w = self.window[i];
                output[start + i] += buffer[i].re * scale * w;
                norm[start + i] += w * w;
            }
        }

        for (sample, &n) in output.iter_mut().zip(&norm) {
            if n > 1e-8 {
                *sample /= n;
            }
        }

        let mut signal: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
        signal.resize(length, 0.0);
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_frame_count_is_centered() {
        let stft = Stft::new(512, 128);
        assert_eq!(stft.forward(&vec![0.0; 1000]).len(), 1 + 1000 / 128);
        assert_eq!(stft.forward(&[]).len(), 1);
    }

    #[test]
    fn test_peak_bin_matches_frequency() {
        let stft = Stft::new(1024, 256);
        let signal = sine(1000.0, 16_000.0, 4096);
        let power = stft.power(&signal);
        let mid = &power[power.len() / 2];
        let peak = mid
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        // 1000 Hz / (16000 / 1024) = bin 64
        assert_eq!(peak, 64);
    }

    #[test]
    fn test_inverse_reconstructs_signal() {
        let stft = Stft::new(512, 128);
        let signal = sine(440.0, 8000.0, 3000);
        let frames = stft.forward(&signal);
        let rebuilt = stft.inverse(&frames, signal.len());
        assert_eq!(rebuilt.len(), signal.len());
        for i in 256..2744 {
            assert!((rebuilt[i] - signal[i]).abs() < 1e-3, "mismatch at {}", i);
        }
    }
}
