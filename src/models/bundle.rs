// src/models/bundle.rs
//
// JSON persistence for trained models: estimator state, scaler parameters,
// class names and enough run metadata to tell bundles apart.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::estimator::EstimatorParams;
use super::harness::TrainedModel;
use super::scaler::StandardScaler;
use crate::core::FEATURE_DIM;
use crate::dataset::ClassLabels;
use crate::error::BundleError;

pub const BUNDLE_FORMAT_VERSION: u32 = 1;
pub const BUNDLE_EXTENSION: &str = "model.json";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
    pub run_id: Uuid,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub class_names: Vec<String>,
    pub feature_dim: usize,
    #[serde(default)]
    pub corpus_fingerprint: Option<String>,
    pub estimator: EstimatorParams,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
}

impl ModelBundle {
    pub fn from_model(
        model: &TrainedModel,
        accuracy: Option<f64>,
        run_id: Uuid,
        corpus_fingerprint: Option<String>,
    ) -> Result<Self, BundleError> {
        let estimator = model
            .estimator()
            .export()
            .ok_or_else(|| BundleError::NotExportable(model.name().to_string()))?;
        Ok(Self {
            format_version: BUNDLE_FORMAT_VERSION,
            model_name: model.name().to_string(),
            created_at: Utc::now(),
            run_id,
            accuracy,
            class_names: model.classes().names().to_vec(),
            feature_dim: model.feature_dim(),
            corpus_fingerprint,
            estimator,
            scaler: model.scaler().cloned(),
        })
    }

    pub fn into_model(self) -> Result<TrainedModel, BundleError> {
        let classes = ClassLabels::new(self.class_names).map_err(|_| BundleError::ClassList)?;
        Ok(TrainedModel::new(
            self.model_name,
            self.estimator.into_estimator(),
            self.scaler,
            classes,
            self.feature_dim,
        ))
    }

    pub fn to_json(&self) -> Result<String, BundleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and check a bundle. The version is checked before the body so
    /// a newer layout reports a version error rather than a parse error.
    pub fn from_json(text: &str) -> Result<Self, BundleError> {
        let header: VersionHeader = serde_json::from_str(text)?;
        if header.format_version != BUNDLE_FORMAT_VERSION {
            return Err(BundleError::Version {
                found: header.format_version,
                expected: BUNDLE_FORMAT_VERSION,
            });
        }
        let bundle: Self = serde_json::from_str(text)?;
        if ClassLabels::new(bundle.class_names.iter()).is_err() {
            return Err(BundleError::ClassList);
        }
        if bundle.feature_dim != FEATURE_DIM {
            return Err(BundleError::FeatureDim {
                found: bundle.feature_dim,
                expected: FEATURE_DIM,
            });
        }
        if let Some(scaler) = &bundle.scaler {
            if scaler.mean().len() != bundle.feature_dim {
                return Err(BundleError::FeatureDim {
                    found: scaler.mean().len(),
                    expected: bundle.feature_dim,
                });
            }
        }
        Ok(bundle)
    }

    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| BundleError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.to_json()?).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let text = fs::read_to_string(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// `"Logistic Regression"` -> `"logistic-regression.model.json"`
pub fn bundle_file_name(model_name: &str) -> String {
    let mut slug = String::with_capacity(model_name.len());
    for c in model_name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "model" } else { slug };
    format!("{}.{}", slug, BUNDLE_EXTENSION)
}

/// Per-user default location for saved bundles
pub fn default_model_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("crysense").join("models"))
}
