//! Band-limited resampling via rubato

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Resample a mono signal by `ratio` (output rate / input rate).
///
/// The whole signal is processed as one chunk. The resampler's group delay is
/// flushed with trailing zeros and trimmed from the front, so the result is
/// aligned with the input and has `round(len * ratio)` samples.
pub fn resample_ratio(samples: &[f32], ratio: f64) -> Result<Vec<f32>, String> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(format!("invalid resample ratio {}", ratio));
    }
    if (ratio - 1.0).abs() < 1e-9 {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    // enough trailing input to push the delayed tail through
    let flush = 2 * params.sinc_len + (params.sinc_len as f64 / ratio).ceil() as usize;
    let mut input = samples.to_vec();
    input.resize(samples.len() + flush, 0.0);
    let chunk_size = input.len();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk_size, 1)
        .map_err(|e| e.to_string())?;
    let delay = resampler.output_delay();

    let waves_in = vec![input];
    let waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| e.to_string())?;
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let mut output: Vec<f32> = waves_out
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .skip(delay)
        .take(expected)
        .collect();
    output.resize(expected, 0.0);
    Ok(output)
}

/// Resample between two integer rates
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, String> {
    if from == 0 || to == 0 {
        return Err(format!("invalid sample rates {} -> {}", from, to));
    }
    if from == to {
        return Ok(samples.to_vec());
    }
    resample_ratio(samples, to as f64 / from as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_output_length_follows_ratio() {
        let input = vec![0.1f32; 4410];
        let out = resample(&input, 44_100, 22_050).unwrap();
        assert_eq!(out.len(), 2205);
        let out = resample_ratio(&input, 1.25).unwrap();
        assert_eq!(out.len(), 5513);
    }

    #[test]
    fn test_identity_and_empty() {
        let input = vec![0.5f32, -0.5, 0.25];
        assert_eq!(resample(&input, 8000, 8000).unwrap(), input);
        assert!(resample_ratio(&[], 2.0).unwrap().is_empty());
        assert!(resample_ratio(&input, 0.0).is_err());
    }

    #[test]
    fn test_tone_survives_downsampling() {
        let input: Vec<f32> = (0..8000)
            .map(|i| (2.0 * PI * 200.0 * i as f32 / 16_000.0).sin())
            .collect();
        let out = resample(&input, 16_000, 8000).unwrap();
        let rms_in = crate::core::dsp::stats::rms(&input);
        let rms_out = crate::core::dsp::stats::rms(&out[200..3800]);
        assert!((rms_in - rms_out).abs() < 0.05, "rms {} vs {}", rms_in, rms_out);
    }
}
