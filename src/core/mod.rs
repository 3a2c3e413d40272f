//! Core signal path: decoding, feature extraction and augmentation

pub mod augment;
pub mod decoder;
pub mod dsp;
pub mod features;

pub use augment::{AudioAugmenter, AugmentKind, AugmentedVariant};
pub use decoder::{decode_audio, decode_audio_until, extract_mono, AudioData, AudioSample, Decoder, SymphoniaDecoder};
pub use features::{FeatureExtractor, FeatureVector, DELTA_WIDTH, FEATURE_DIM, N_MFCC};
