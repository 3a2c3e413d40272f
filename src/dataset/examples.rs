//! Labeled feature rows and the dataset that holds them

use std::path::PathBuf;

use super::labels::ClassLabels;
use crate::core::{AugmentKind, FeatureVector};

/// Where a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleOrigin {
    Original,
    Augmented(AugmentKind),
}

impl ExampleOrigin {
    pub fn is_augmented(&self) -> bool {
        matches!(self, ExampleOrigin::Augmented(_))
    }
}

/// One (feature vector, label) row with provenance
#[derive(Debug, Clone)]
pub struct LabeledExample {
    pub features: FeatureVector,
    pub label: usize,
    pub origin: ExampleOrigin,
    pub source: PathBuf,
}

/// Ordered rows grouped by label, plus the label ordering they refer to
#[derive(Debug, Clone)]
pub struct Dataset {
    examples: Vec<LabeledExample>,
    classes: ClassLabels,
}

impl Dataset {
    pub fn new(classes: ClassLabels) -> Self {
        Self {
            examples: Vec::new(),
            classes,
        }
    }

    /// Build from bare rows; labels must be in range of `classes`
    pub fn from_rows(
        rows: Vec<(FeatureVector, usize)>,
        classes: ClassLabels,
    ) -> Result<Self, String> {
        let mut dataset = Self::new(classes);
        for (features, label) in rows {
            if label >= dataset.classes.len() {
                return Err(format!(
                    "label {} out of range for {} classes",
                    label,
                    dataset.classes.len()
                ));
            }
            dataset.examples.push(LabeledExample {
                features,
                label,
                origin: ExampleOrigin::Original,
                source: PathBuf::new(),
            });
        }
        Ok(dataset)
    }

    pub(crate) fn push(&mut self, example: LabeledExample) {
        debug_assert!(example.label < self.classes.len());
        self.examples.push(example);
    }

    pub fn classes(&self) -> &ClassLabels {
        &self.classes
    }

    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Feature matrix X, one row per example
    pub fn features(&self) -> Vec<&[f32]> {
        self.examples.iter().map(|e| e.features.as_slice()).collect()
    }

    /// Label vector y
    pub fn labels(&self) -> Vec<usize> {
        self.examples.iter().map(|e| e.label).collect()
    }

    /// Row count per label
    pub fn class_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.classes.len()];
        for example in &self.examples {
            sizes[example.label] += 1;
        }
        sizes
    }
}
