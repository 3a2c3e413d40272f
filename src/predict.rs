// src/predict.rs
//
// Single-file inference. Every failure is folded into a sentinel outcome so
// callers always get an answer for the file they asked about.

use std::fmt;
use std::path::Path;

use log::{debug, warn};
use serde::{Serialize, Serializer};

use crate::core::{Decoder, FeatureExtractor};
use crate::models::TrainedModel;

/// Outcome of classifying one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// Predicted class name
    Class(String),
    /// The file could not be decoded
    InvalidAudio,
    /// Decoded, but no feature vector could be computed
    FeatureExtractionFailed,
    /// The model rejected the features or failed while predicting
    ModelFailure,
}

impl Prediction {
    pub fn as_str(&self) -> &str {
        match self {
            Prediction::Class(name) => name,
            Prediction::InvalidAudio => "invalid audio",
            Prediction::FeatureExtractionFailed => "feature extraction failed",
            Prediction::ModelFailure => "prediction failed",
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Prediction::Class(_))
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Decode, extract and classify with a fitted model. The model's scaler (if
/// any) is applied inside [`TrainedModel::predict_row`].
pub struct PredictionService<'a> {
    decoder: &'a dyn Decoder,
    extractor: &'a FeatureExtractor,
}

impl<'a> PredictionService<'a> {
    pub fn new(decoder: &'a dyn Decoder, extractor: &'a FeatureExtractor) -> Self {
        Self { decoder, extractor }
    }

    pub fn predict(&self, path: &Path, model: &TrainedModel) -> Prediction {
        let audio = match self.decoder.decode(path) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                return Prediction::InvalidAudio;
            }
        };

        let features = match self.extractor.extract(&audio) {
            Ok(features) => features,
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                return Prediction::FeatureExtractionFailed;
            }
        };

        match model.predict_name(features.as_slice()) {
            Ok(name) => {
                debug!("{}: {} via {}", path.display(), name, model.name());
                Prediction::Class(name.to_string())
            }
            Err(e) => {
                warn!("{}: model '{}' failed: {}", path.display(), model.name(), e);
                Prediction::ModelFailure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AudioSample;
    use crate::dataset::ClassLabels;
    use crate::error::{DecodeError, ModelError};
    use crate::models::{Estimator, NearestCentroid};

    const SR: u32 = 22050;

    fn tone(freq: f32) -> AudioSample {
        let samples = (0..SR as usize)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect();
        AudioSample::new(samples, SR)
    }

    /// "low*" paths decode to a 220 Hz tone, "high*" to 3520 Hz, "silent*"
    /// to zeros and anything else fails
    struct ToneDecoder;

    impl Decoder for ToneDecoder {
        fn decode(&self, path: &Path) -> Result<AudioSample, DecodeError> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if stem.starts_with("low") {
                Ok(tone(220.0))
            } else if stem.starts_with("high") {
                Ok(tone(3520.0))
            } else if stem.starts_with("silent") {
                Ok(AudioSample::new(vec![0.0; SR as usize], SR))
            } else {
                Err(DecodeError::Empty)
            }
        }
    }

    struct BrokenEstimator;

    impl Estimator for BrokenEstimator {
        fn kind(&self) -> &'static str {
            "broken"
        }
        fn fit(&mut self, _: &[Vec<f32>], _: &[usize]) -> Result<(), ModelError> {
            Ok(())
        }
        fn predict(&self, _: &[Vec<f32>]) -> Result<Vec<usize>, ModelError> {
            Err(ModelError::Numerical("overflow".into()))
        }
    }

    fn classes() -> ClassLabels {
        ClassLabels::new(["low", "high"]).unwrap()
    }

    fn tone_model(extractor: &FeatureExtractor) -> TrainedModel {
        let x: Vec<Vec<f32>> = [220.0, 3520.0]
            .iter()
            .map(|&f| extractor.extract(&tone(f)).unwrap().as_slice().to_vec())
            .collect();
        let mut est = NearestCentroid::new();
        est.fit(&x, &[0, 1]).unwrap();
        TrainedModel::new("centroid".into(), Box::new(est), None, classes(), x[0].len())
    }

    #[test]
    fn test_predicts_class_deterministically() {
        let extractor = FeatureExtractor::default();
        let model = tone_model(&extractor);
        let service = PredictionService::new(&ToneDecoder, &extractor);

        let first = service.predict(Path::new("low_1.wav"), &model);
        assert_eq!(first, Prediction::Class("low".into()));
        assert_eq!(service.predict(Path::new("low_1.wav"), &model), first);
        assert_eq!(
            service.predict(Path::new("high_7.wav"), &model),
            Prediction::Class("high".into())
        );
    }

    #[test]
    fn test_sentinels() {
        let extractor = FeatureExtractor::default();
        let model = tone_model(&extractor);
        let service = PredictionService::new(&ToneDecoder, &extractor);

        let invalid = service.predict(Path::new("garbage.wav"), &model);
        assert_eq!(invalid, Prediction::InvalidAudio);
        assert_eq!(invalid.to_string(), "invalid audio");

        let silent = service.predict(Path::new("silent.wav"), &model);
        assert_eq!(silent, Prediction::FeatureExtractionFailed);
        assert_eq!(silent.to_string(), "feature extraction failed");

        let broken = TrainedModel::new(
            "broken".into(),
            Box::new(BrokenEstimator),
            None,
            classes(),
            model.feature_dim(),
        );
        let failed = service.predict(Path::new("low.wav"), &broken);
        assert_eq!(failed, Prediction::ModelFailure);
        assert!(!failed.is_class());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Prediction::Class("hungry".into())).unwrap();
        assert_eq!(json, "\"hungry\"");
        let json = serde_json::to_string(&Prediction::InvalidAudio).unwrap();
        assert_eq!(json, "\"invalid audio\"");
    }
}
