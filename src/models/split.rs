// src/models/split.rs
//
// Stratified train/test split with a seeded shuffle.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::SplitConfig;
use crate::error::SplitError;

/// Row indices on each side of the split, in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl StratifiedSplit {
    /// Split `labels` so every label keeps (approximately) its proportion on
    /// both sides. Each label gets `round(n * test_fraction)` test rows,
    /// clamped so both sides hold at least one.
    pub fn new(labels: &[usize], config: &SplitConfig) -> Result<Self, SplitError> {
        if labels.is_empty() {
            return Err(SplitError::Empty);
        }
        let fraction = config.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(SplitError::InvalidFraction(fraction));
        }

        let n_labels = labels.iter().max().map_or(0, |m| m + 1);
        let mut by_label: Vec<Vec<usize>> = vec![Vec::new(); n_labels];
        for (i, &label) in labels.iter().enumerate() {
            by_label[label].push(i);
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut train = Vec::with_capacity(labels.len());
        let mut test = Vec::new();

        for (label, mut rows) in by_label.into_iter().enumerate() {
            if rows.is_empty() {
                continue;
            }
            if rows.len() < 2 {
                return Err(SplitError::ClassTooSmall {
                    label,
                    count: rows.len(),
                });
            }
            let n_test = ((rows.len() as f64 * fraction).round() as usize).clamp(1, rows.len() - 1);
            rows.shuffle(&mut rng);
            test.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();
        Ok(Self { train, test })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(sizes: &[usize]) -> Vec<usize> {
        sizes
            .iter()
            .enumerate()
            .flat_map(|(label, &n)| std::iter::repeat(label).take(n))
            .collect()
    }

    fn count(idx: &[usize], y: &[usize], label: usize) -> usize {
        idx.iter().filter(|&&i| y[i] == label).count()
    }

    #[test]
    fn test_balanced_corpus_split() {
        let y = labels(&[50; 5]);
        let split = StratifiedSplit::new(&y, &SplitConfig::default()).unwrap();
        assert_eq!(split.test.len(), 50);
        assert_eq!(split.train.len(), 200);
        for label in 0..5 {
            assert_eq!(count(&split.test, &y, label), 10);
            assert_eq!(count(&split.train, &y, label), 40);
        }
    }

    #[test]
    fn test_disjoint_and_complete() {
        let y = labels(&[7, 3, 12]);
        let split = StratifiedSplit::new(&y, &SplitConfig::default()).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..y.len()).collect::<Vec<_>>());
        // Small classes still get one test row
        assert_eq!(count(&split.test, &y, 1), 1);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let y = labels(&[20, 20]);
        let config = SplitConfig {
            seed: 7,
            ..Default::default()
        };
        let a = StratifiedSplit::new(&y, &config).unwrap();
        let b = StratifiedSplit::new(&y, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_errors() {
        let config = SplitConfig::default();
        assert_eq!(StratifiedSplit::new(&[], &config), Err(SplitError::Empty));
        assert_eq!(
            StratifiedSplit::new(&[0, 0, 1], &config),
            Err(SplitError::ClassTooSmall { label: 1, count: 1 })
        );
        let bad = SplitConfig {
            test_fraction: 1.0,
            ..Default::default()
        };
        assert_eq!(
            StratifiedSplit::new(&[0, 0], &bad),
            Err(SplitError::InvalidFraction(1.0))
        );
    }
}
