//! Statistical helpers over signals and per-band trajectories

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Per-column mean of a `[frame][band]` matrix
pub fn column_mean(matrix: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = matrix.first() else {
        return Vec::new();
    };
    let mut sums = vec![0.0f64; first.len()];
    for row in matrix {
        for (acc, &v) in sums.iter_mut().zip(row) {
            *acc += v as f64;
        }
    }
    let n = matrix.len() as f64;
    sums.into_iter().map(|s| (s / n) as f32).collect()
}

/// Per-column population standard deviation
pub fn column_std(matrix: &[Vec<f32>]) -> Vec<f32> {
    let means = column_mean(matrix);
    if means.is_empty() {
        return means;
    }
    let mut sq = vec![0.0f64; means.len()];
    for row in matrix {
        for ((acc, &v), &m) in sq.iter_mut().zip(row).zip(&means) {
            let d = v as f64 - m as f64;
            *acc += d * d;
        }
    }
    let n = matrix.len() as f64;
    sq.into_iter().map(|s| (s / n).sqrt() as f32).collect()
}

/// Per-column maximum
pub fn column_max(matrix: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = matrix.first() else {
        return Vec::new();
    };
    let mut max = first.clone();
    for row in &matrix[1..] {
        for (acc, &v) in max.iter_mut().zip(row) {
            *acc = acc.max(v);
        }
    }
    max
}

/// Which time derivative [`delta`] estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOrder {
    First,
    Second,
}

/// Savitzky-Golay derivative of each column over `width` frames (odd), with
/// polynomial degree equal to the derivative order. The first and last
/// `width / 2` frames take the derivative of the polynomial fitted to the
/// nearest full window. Inputs shorter than `width` yield zeros.
pub fn delta(matrix: &[Vec<f32>], width: usize, order: DeltaOrder) -> Vec<Vec<f32>> {
    let half = width / 2;
    let frames = matrix.len();
    let bands = matrix.first().map_or(0, Vec::len);
    if half == 0 || frames < 2 * half + 1 {
        return vec![vec![0.0; bands]; frames];
    }

    let offsets = -(half as isize)..=half as isize;
    let weights: Vec<f32> = match order {
        DeltaOrder::First => {
            let norm: f32 = offsets.clone().map(|k| (k * k) as f32).sum();
            offsets.map(|k| k as f32 / norm).collect()
        }
        DeltaOrder::Second => {
            // Second derivative of the least-squares parabola is 2c
            let n = (2 * half + 1) as f32;
            let mean_sq = offsets.clone().map(|k| (k * k) as f32).sum::<f32>() / n;
            let centered: Vec<f32> = offsets.map(|k| (k * k) as f32 - mean_sq).collect();
            let norm: f32 = centered.iter().map(|c| c * c).sum();
            centered.iter().map(|c| 2.0 * c / norm).collect()
        }
    };

    let at_center = |c: usize| -> Vec<f32> {
        let mut out = vec![0.0f32; bands];
        for (w, row) in weights.iter().zip(&matrix[c - half..=c + half]) {
            for (o, &v) in out.iter_mut().zip(row) {
                *o += w * v;
            }
        }
        out
    };

    (0..frames)
        .map(|t| at_center(t.clamp(half, frames - 1 - half)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        let samples = vec![1.0, -1.0, 1.0, -1.0];
        assert!((rms(&samples) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_column_stats() {
        let m = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        assert_eq!(column_mean(&m), vec![2.0, 10.0]);
        assert_eq!(column_std(&m), vec![1.0, 0.0]);
        assert_eq!(column_max(&m), vec![3.0, 10.0]);
    }

    #[test]
    fn test_delta_of_ramp_is_slope() {
        let m: Vec<Vec<f32>> = (0..20).map(|t| vec![2.0 * t as f32]).collect();
        let d = delta(&m, 9, DeltaOrder::First);
        assert_eq!(d.len(), 20);
        // the fitted line is exact, edges included
        for row in &d {
            assert!((row[0] - 2.0).abs() < 1e-4, "{}", row[0]);
        }
    }

    #[test]
    fn test_delta_edges_use_nearest_full_window() {
        let m: Vec<Vec<f32>> = (0..12).map(|t| vec![(t * t) as f32]).collect();
        let d = delta(&m, 9, DeltaOrder::First);
        // interior slope of t^2 is 2t
        for t in 4..8 {
            assert!((d[t][0] - 2.0 * t as f32).abs() < 1e-3, "t={} got {}", t, d[t][0]);
        }
        // edges hold the slope of the first and last full windows
        for t in 0..4 {
            assert!((d[t][0] - 8.0).abs() < 1e-3);
        }
        for t in 8..12 {
            assert!((d[t][0] - 14.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_second_order_is_direct() {
        let m: Vec<Vec<f32>> = (0..15).map(|t| vec![0.5 * (t * t) as f32 - t as f32]).collect();
        let d2 = delta(&m, 9, DeltaOrder::Second);
        for row in &d2 {
            assert!((row[0] - 1.0).abs() < 1e-3, "{}", row[0]);
        }
        // unlike the delta of the delta, which loses the edges twice
        let nested = delta(&delta(&m, 9, DeltaOrder::First), 9, DeltaOrder::First);
        assert!((nested[0][0] - 1.0).abs() > 1e-2);
    }

    #[test]
    fn test_delta_of_constant_is_zero() {
        let m = vec![vec![5.0, -1.0]; 12];
        for order in [DeltaOrder::First, DeltaOrder::Second] {
            for row in delta(&m, 9, order) {
                assert!(row.iter().all(|v| v.abs() < 1e-4));
            }
        }
    }

    #[test]
    fn test_delta_shorter_than_window_is_zero() {
        let m = vec![vec![1.0], vec![4.0], vec![9.0]];
        assert_eq!(delta(&m, 9, DeltaOrder::First), vec![vec![0.0]; 3]);
    }
}
