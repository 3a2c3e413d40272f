//! Corpus loading and class balancing
//!
//! - `labels` - the injected class ordering and raw class counts
//! - `examples` - labeled rows and the [`Dataset`] container
//! - `balancer` - majority-target balancing with bounded augmentation cycling

mod balancer;
mod examples;
mod labels;

pub use balancer::{
    corpus_fingerprint, list_audio_files, BalancedDataset, DatasetBalancer, SkipStage, SkippedFile,
};
pub use examples::{Dataset, ExampleOrigin, LabeledExample};
pub use labels::{ClassCounts, ClassLabels};
