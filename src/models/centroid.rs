//! Nearest-centroid classifier

use serde::{Deserialize, Serialize};

use super::estimator::{squared_distance, validate_rows, validate_training, Estimator, EstimatorParams};
use crate::error::ModelError;

/// One mean vector per label; labels absent from training have none
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroid {
    #[serde(default)]
    centroids: Vec<Option<Vec<f32>>>,
}

impl NearestCentroid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn centroids(&self) -> &[Option<Vec<f32>>] {
        &self.centroids
    }

    fn dim(&self) -> Option<usize> {
        self.centroids.iter().flatten().next().map(Vec::len)
    }
}

impl Estimator for NearestCentroid {
    fn kind(&self) -> &'static str {
        "nearest_centroid"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[usize]) -> Result<(), ModelError> {
        let dim = validate_training(x, y)?;
        let n_labels = y.iter().max().map_or(0, |m| m + 1);

        let mut sums = vec![vec![0.0f64; dim]; n_labels];
        let mut counts = vec![0usize; n_labels];
        for (row, &label) in x.iter().zip(y) {
            counts[label] += 1;
            for (s, &v) in sums[label].iter_mut().zip(row) {
                *s += v as f64;
            }
        }

        self.centroids = sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| {
                (count > 0).then(|| sum.iter().map(|s| (s / count as f64) as f32).collect())
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<usize>, ModelError> {
        let dim = self.dim().ok_or(ModelError::NotFitted)?;
        validate_rows(x, dim)?;

        Ok(x.iter()
            .map(|row| {
                let mut best = (f32::INFINITY, 0);
                for (label, centroid) in self.centroids.iter().enumerate() {
                    if let Some(c) = centroid {
                        let d = squared_distance(c, row);
                        if d < best.0 {
                            best = (d, label);
                        }
                    }
                }
                best.1
            })
            .collect())
    }

    fn export(&self) -> Option<EstimatorParams> {
        Some(EstimatorParams::NearestCentroid(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroids_and_prediction() {
        let x = vec![vec![0.0], vec![2.0], vec![10.0], vec![12.0]];
        let y = vec![0, 0, 2, 2];
        let mut model = NearestCentroid::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.centroids()[0], Some(vec![1.0]));
        assert_eq!(model.centroids()[1], None);
        assert_eq!(model.centroids()[2], Some(vec![11.0]));
        assert_eq!(model.predict(&[vec![3.0], vec![9.0]]).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_not_fitted() {
        assert_eq!(
            NearestCentroid::new().predict(&[vec![0.0]]),
            Err(ModelError::NotFitted)
        );
    }
}
