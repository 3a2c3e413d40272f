//! CLI argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ExhaustionPolicy, PipelineBuilder, PipelineConfig};
use crate::dataset::ClassLabels;
use crate::error::{ConfigError, PipelineError};

pub const DEFAULT_CLASSES: [&str; 5] = ["belly_pain", "burping", "discomfort", "hungry", "tired"];

#[derive(Parser, Debug, Clone)]
#[command(name = "crysense")]
#[command(version)]
#[command(about = "Balance an infant-cry corpus, train classifiers and label new recordings")]
pub struct Args {
    /// Corpus root with one subfolder per class
    #[arg(short, long, default_value = ".", env = "CRYSENSE_ROOT")]
    pub root: PathBuf,

    /// Ordered class names; the position of each name is its label
    #[arg(short, long, value_delimiter = ',', default_values_t = DEFAULT_CLASSES.map(String::from))]
    pub classes: Vec<String>,

    /// JSON pipeline configuration; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for augmentation randomness and the train/test split
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Classify this file after training (or with --model)
    #[arg(short, long)]
    pub predict: Option<PathBuf>,

    /// Write one bundle per trained model into DIR (default: the per-user data directory)
    #[arg(long, value_name = "DIR")]
    pub save_models: Option<Option<PathBuf>>,

    /// Skip training and predict with a saved bundle
    #[arg(short, long, requires = "predict")]
    pub model: Option<PathBuf>,

    /// Upper bound on augmentation passes per class
    #[arg(long)]
    pub max_passes: Option<usize>,

    /// Record classes left short of the target instead of aborting
    #[arg(long)]
    pub continue_on_shortfall: bool,

    /// Show progress bars while extracting features
    #[arg(long)]
    pub progress: bool,

    /// Machine-readable output
    #[arg(long)]
    pub json: bool,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// File configuration (or defaults) with flag overrides applied
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        let mut builder = PipelineBuilder::from_config(base);

        if let Some(seed) = self.seed {
            builder = builder.seed(seed).split_seed(seed);
        }
        if let Some(passes) = self.max_passes {
            builder = builder.max_passes(passes);
        }
        if self.continue_on_shortfall {
            builder = builder.on_exhaustion(ExhaustionPolicy::Continue);
        }
        if self.progress {
            builder = builder.show_progress(true);
        }
        builder.build()
    }

    pub fn class_labels(&self) -> Result<ClassLabels, PipelineError> {
        ClassLabels::new(self.classes.iter().map(|c| c.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("crysense").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.classes, DEFAULT_CLASSES.map(String::from).to_vec());
        assert!(args.predict.is_none());
        assert!(args.save_models.is_none());
        let config = args.pipeline_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--classes",
            "a, b,c",
            "--seed",
            "9",
            "--max-passes",
            "3",
            "--continue-on-shortfall",
        ]);
        let labels = args.class_labels().unwrap();
        assert_eq!(labels.names(), &["a", "b", "c"]);

        let config = args.pipeline_config().unwrap();
        assert_eq!(config.augment.seed, Some(9));
        assert_eq!(config.split.seed, 9);
        assert_eq!(config.balance.max_passes, 3);
        assert_eq!(config.balance.on_exhaustion, ExhaustionPolicy::Continue);
    }

    #[test]
    fn test_save_models_optional_value() {
        assert_eq!(parse(&["--save-models"]).save_models, Some(None));
        assert_eq!(
            parse(&["--save-models", "out"]).save_models,
            Some(Some(PathBuf::from("out")))
        );
    }

    #[test]
    fn test_model_requires_predict() {
        let argv = ["crysense", "--model", "knn.model.json"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_duplicate_classes_rejected() {
        assert!(parse(&["--classes", "a,a"]).class_labels().is_err());
    }
}
