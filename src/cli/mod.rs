// src/cli/mod.rs
//
// Command-line interface: balance, train, persist and predict.

mod args;
mod output;

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use uuid::Uuid;

pub use args::{Args, DEFAULT_CLASSES};
pub use output::{
    format_balance, format_json, format_predictions, format_report, prediction_lines, PredictionLine,
    RunSummary,
};

use crate::config::PipelineConfig;
use crate::core::{AudioAugmenter, FeatureExtractor, SymphoniaDecoder};
use crate::dataset::DatasetBalancer;
use crate::models::{
    bundle_file_name, default_model_bank, default_model_dir, ModelBundle, TrainedModel,
    TrainingHarness, TrainingReport,
};
use crate::predict::PredictionService;

/// Run the CLI
pub fn run(args: &Args) -> Result<()> {
    let config = args.pipeline_config().context("invalid configuration")?;
    let decoder = SymphoniaDecoder::new(config.decode.clone());
    let extractor = FeatureExtractor::new(config.extraction.clone());
    let service = PredictionService::new(&decoder, &extractor);
    let mut summary = RunSummary::default();

    if let Some(bundle_path) = &args.model {
        let model = ModelBundle::load(bundle_path)
            .and_then(ModelBundle::into_model)
            .with_context(|| format!("failed to load model bundle {}", bundle_path.display()))?;
        if let Some(path) = &args.predict {
            summary.predictions =
                vec![PredictionLine::predicted(model.name(), service.predict(path, &model))];
            if !args.json {
                print!("{}", format_predictions(path, &summary.predictions));
            }
        }
        return finish(args, &summary);
    }

    let report = train(args, &config, &decoder, &extractor, &mut summary)?;

    if let Some(path) = &args.predict {
        summary.predictions = prediction_lines(&report, |model| service.predict(path, model));
        if !args.json {
            print!("{}", format_predictions(path, &summary.predictions));
        }
    }

    finish(args, &summary)
}

fn train(
    args: &Args,
    config: &PipelineConfig,
    decoder: &SymphoniaDecoder,
    extractor: &FeatureExtractor,
    summary: &mut RunSummary,
) -> Result<TrainingReport> {
    let classes = args.class_labels()?;
    let augmenter = AudioAugmenter::new(config.augment.clone());
    let mut balancer = DatasetBalancer::new(decoder, extractor, augmenter, config.balance.clone());

    let balanced = balancer
        .balance(&classes, &args.root)
        .with_context(|| format!("failed to build a balanced dataset from {}", args.root.display()))?;
    summary.record_balance(&balanced);
    if !args.json {
        print!("{}", format_balance(&balanced));
    }

    let report = TrainingHarness::new(config.split.clone())
        .run(&balanced.dataset, default_model_bank())
        .context("failed to split the dataset")?;
    summary.record_report(&report);
    if !args.json {
        print!("{}", format_report(&report));
    }

    if let Some(dir) = &args.save_models {
        let dir = match dir {
            Some(dir) => dir.clone(),
            None => default_model_dir().context("no per-user data directory available")?,
        };
        let run_id = Uuid::new_v4();
        for evaluated in report.ranked() {
            let path = save_bundle(
                &evaluated.model,
                evaluated.accuracy,
                run_id,
                &balanced.fingerprint,
                &dir,
            )?;
            if !args.json {
                println!("  saved {}", path.display());
            }
        }
    }

    Ok(report)
}

fn save_bundle(
    model: &TrainedModel,
    accuracy: f64,
    run_id: Uuid,
    fingerprint: &str,
    dir: &Path,
) -> Result<std::path::PathBuf> {
    let bundle = ModelBundle::from_model(model, Some(accuracy), run_id, Some(fingerprint.to_string()))?;
    let path = dir.join(bundle_file_name(model.name()));
    bundle
        .save(&path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    info!("Saved {} to {}", model.name(), path.display());
    Ok(path)
}

fn finish(args: &Args, summary: &RunSummary) -> Result<()> {
    if args.json {
        println!("{}", format_json(summary)?);
    }
    Ok(())
}
