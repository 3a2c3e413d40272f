//! Configuration module for crysense

mod pipeline;

pub use pipeline::{
    AugmentConfig, BalanceConfig, DecodeConfig, ExhaustionPolicy, ExtractionConfig,
    PipelineBuilder, PipelineConfig, SplitConfig, DEFAULT_EXTENSIONS,
};
