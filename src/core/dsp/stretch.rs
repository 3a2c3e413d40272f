//! Phase-vocoder time stretching and pitch shifting

use num_complex::Complex32;
use std::f32::consts::PI;

use super::resample::resample_ratio;
use super::stft::{SpectrumFrame, Stft};

const N_FFT: usize = 2048;
const HOP: usize = N_FFT / 4;

/// Resynthesize `frames` at `rate` times the original speed
pub fn phase_vocoder(frames: &[SpectrumFrame], rate: f32, hop: usize) -> Vec<SpectrumFrame> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };
    let n_bins = first.len();
    let n_fft = 2 * (n_bins - 1);

    // expected phase advance per hop for each bin
    let phi_advance: Vec<f32> = (0..n_bins)
        .map(|k| 2.0 * PI * hop as f32 * k as f32 / n_fft as f32)
        .collect();
    let mut phase_acc: Vec<f32> = first.iter().map(|c| c.arg()).collect();

    let zero = vec![Complex32::new(0.0, 0.0); n_bins];
    let column = |t: usize| frames.get(t).unwrap_or(&zero);

    let n_out = (frames.len() as f32 / rate).ceil() as usize;
    let mut output = Vec::with_capacity(n_out);

    for t in 0..n_out {
        let step = t as f32 * rate;
        let idx = step.floor() as usize;
        let alpha = step - idx as f32;
        let (left, right) = (column(idx), column(idx + 1));

        let frame: SpectrumFrame = (0..n_bins)
            .map(|k| {
                let mag = (1.0 - alpha) * left[k].norm() + alpha * right[k].norm();
                Complex32::from_polar(mag, phase_acc[k])
            })
            .collect();
        output.push(frame);

        for k in 0..n_bins {
            let mut dphase = right[k].arg() - left[k].arg() - phi_advance[k];
            dphase -= 2.0 * PI * (dphase / (2.0 * PI)).round();
            phase_acc[k] += phi_advance[k] + dphase;
        }
    }

    output
}

/// Change duration by `1 / rate` without changing pitch.
/// Output length is `round(len / rate)`.
pub fn time_stretch(samples: &[f32], rate: f32) -> Result<Vec<f32>, String> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(format!("invalid stretch rate {}", rate));
    }
    let stft = Stft::new(N_FFT, HOP);
    let frames = stft.forward(samples);
    let stretched = phase_vocoder(&frames, rate, HOP);
    let length = (samples.len() as f32 / rate).round() as usize;
    Ok(stft.inverse(&stretched, length))
}

/// Shift pitch by `n_steps` semitones while keeping the length unchanged
pub fn pitch_shift(samples: &[f32], n_steps: f32) -> Result<Vec<f32>, String> {
    let rate = 2.0f32.powf(-n_steps / 12.0);
    let stretched = time_stretch(samples, rate)?;
    let mut shifted = resample_ratio(&stretched, rate as f64)?;
    shifted.resize(samples.len(), 0.0);
    Ok(shifted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn zero_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count()
    }

    #[test]
    fn test_stretch_length() {
        let input = sine(300.0, 8000.0, 8000);
        assert_eq!(time_stretch(&input, 1.1).unwrap().len(), 7273);
        assert_eq!(time_stretch(&input, 0.9).unwrap().len(), 8889);
        assert!(time_stretch(&input, 0.0).is_err());
    }

    #[test]
    fn test_pitch_shift_keeps_length_and_raises_frequency() {
        let input = sine(300.0, 8000.0, 16_000);
        let shifted = pitch_shift(&input, 2.0).unwrap();
        assert_eq!(shifted.len(), input.len());

        // compare crossings away from the edges
        let before = zero_crossings(&input[2000..14_000]) as f32;
        let after = zero_crossings(&shifted[2000..14_000]) as f32;
        let expected = 2.0f32.powf(2.0 / 12.0);
        assert!(
            (after / before - expected).abs() < 0.06,
            "ratio {} vs {}",
            after / before,
            expected
        );
    }
}
