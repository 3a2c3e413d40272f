//! Output formatting for CLI results

use std::path::Path;

use serde::Serialize;

use crate::dataset::BalancedDataset;
use crate::models::{TrainedModel, TrainingReport};
use crate::predict::Prediction;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";

/// Per-class counts before and after balancing
pub fn format_balance(balanced: &BalancedDataset) -> String {
    let mut output = String::new();
    let classes = balanced.dataset.classes();
    let sizes = balanced.dataset.class_sizes();
    let target = balanced.target();

    output.push_str(&format!(
        "{}Dataset{} {}(target {} per class, majority '{}'){}\n",
        BOLD,
        RESET,
        DIM,
        target,
        classes.name(balanced.majority).unwrap_or("?"),
        RESET
    ));

    let width = classes.names().iter().map(String::len).max().unwrap_or(0);
    for (label, name) in classes.iter() {
        let size = sizes[label];
        let color = if size >= target { GREEN } else { YELLOW };
        let skipped = balanced.skipped.iter().filter(|s| s.label == label).count();
        output.push_str(&format!(
            "  {:<width$}  {:>4} files -> {}{:>4}{} examples",
            name,
            balanced.counts.get(label),
            color,
            size,
            RESET,
            width = width
        ));
        if skipped > 0 {
            output.push_str(&format!(" {}({} unusable){}", DIM, skipped, RESET));
        }
        output.push('\n');
    }

    for shortfall in &balanced.shortfalls {
        output.push_str(&format!("  {}! {}{}\n", YELLOW, shortfall, RESET));
    }
    output.push_str(&format!("  {} examples total\n", balanced.dataset.len()));
    output
}

/// Accuracies best-first, then the configurations that failed
pub fn format_report(report: &TrainingReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n{}Models{} {}(train {}, test {}){}\n",
        BOLD, RESET, DIM, report.train_size, report.test_size, RESET
    ));

    let width = report
        .outcomes
        .iter()
        .map(|o| o.name.len())
        .max()
        .unwrap_or(0);

    for (rank, evaluated) in report.ranked().into_iter().enumerate() {
        let marker = if rank == 0 { "*" } else { " " };
        output.push_str(&format!(
            "  {}{} {:<width$}  {:.4}{}\n",
            GREEN,
            marker,
            evaluated.model.name(),
            evaluated.accuracy,
            RESET,
            width = width
        ));
    }
    for (name, error) in report.failures() {
        output.push_str(&format!(
            "  {}  {:<width$}  FAILED{} {}{}{}\n",
            RED,
            name,
            RESET,
            DIM,
            error,
            RESET,
            width = width
        ));
    }
    output
}

/// One line per model; models that failed to train show as FAILED
pub fn format_predictions(path: &Path, predictions: &[PredictionLine]) -> String {
    let mut output = format!("\n{}Prediction{} {}\n", BOLD, RESET, path.display());
    for line in predictions {
        match (&line.prediction, &line.error) {
            (Some(prediction), _) => {
                let color = if prediction.is_class() { GREEN } else { RED };
                output.push_str(&format!(
                    "  {}: {}{}{}\n",
                    line.model, color, prediction, RESET
                ));
            }
            (None, error) => output.push_str(&format!(
                "  {}: {}FAILED{} {}{}{}\n",
                line.model,
                RED,
                RESET,
                DIM,
                error.as_deref().unwrap_or("not trained"),
                RESET
            )),
        }
    }
    output
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionLine {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionLine {
    pub fn predicted(model: impl Into<String>, prediction: Prediction) -> Self {
        Self {
            model: model.into(),
            prediction: Some(prediction),
            error: None,
        }
    }

    pub fn failed(model: impl Into<String>, error: impl ToString) -> Self {
        Self {
            model: model.into(),
            prediction: None,
            error: Some(error.to_string()),
        }
    }
}

/// Ranked models' predictions first, then a FAILED line per failed model
pub fn prediction_lines<F>(report: &TrainingReport, mut predict: F) -> Vec<PredictionLine>
where
    F: FnMut(&TrainedModel) -> Prediction,
{
    report
        .ranked()
        .into_iter()
        .map(|e| PredictionLine::predicted(e.model.name(), predict(&e.model)))
        .chain(
            report
                .failures()
                .map(|(name, error)| PredictionLine::failed(name, error)),
        )
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub files: usize,
    pub skipped: usize,
    pub examples: usize,
}

#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub accuracy: Option<f64>,
    pub error: Option<String>,
}

/// Machine-readable view of a run
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<ClassSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shortfalls: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<PredictionLine>,
}

impl RunSummary {
    pub fn record_balance(&mut self, balanced: &BalancedDataset) {
        let sizes = balanced.dataset.class_sizes();
        self.corpus_fingerprint = Some(balanced.fingerprint.clone());
        self.classes = balanced
            .dataset
            .classes()
            .iter()
            .map(|(label, name)| ClassSummary {
                name: name.to_string(),
                files: balanced.counts.get(label),
                skipped: balanced.skipped.iter().filter(|s| s.label == label).count(),
                examples: sizes[label],
            })
            .collect();
        self.shortfalls = balanced.shortfalls.iter().map(|s| s.to_string()).collect();
    }

    /// Models ranked best-first, failures last
    pub fn record_report(&mut self, report: &TrainingReport) {
        self.models = report
            .ranked()
            .into_iter()
            .map(|e| ModelSummary {
                name: e.model.name().to_string(),
                accuracy: Some(e.accuracy),
                error: None,
            })
            .chain(report.failures().map(|(name, e)| ModelSummary {
                name: name.to_string(),
                accuracy: None,
                error: Some(e.to_string()),
            }))
            .collect();
    }
}

pub fn format_json(summary: &RunSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_predictions() {
        let lines = vec![
            PredictionLine::predicted("k-NN", Prediction::Class("hungry".into())),
            PredictionLine::predicted("Naive Bayes", Prediction::FeatureExtractionFailed),
        ];
        let text = format_predictions(Path::new("cry.wav"), &lines);
        assert!(text.contains("cry.wav"));
        assert!(text.contains("hungry"));
        assert!(text.contains("feature extraction failed"));
        assert!(!text.contains("FAILED"));
    }

    #[test]
    fn test_failed_model_keeps_its_prediction_line() {
        let lines = vec![
            PredictionLine::predicted("k-NN", Prediction::Class("tired".into())),
            PredictionLine::failed("MLP", "fit failed: training loss diverged"),
        ];
        let text = format_predictions(Path::new("cry.wav"), &lines);
        let failed = text.lines().find(|l| l.contains("MLP")).unwrap();
        assert!(failed.contains("FAILED"));
        assert!(failed.contains("training loss diverged"));
        assert_eq!(text.lines().filter(|l| l.starts_with("  ")).count(), 2);

        let json = serde_json::to_value(&lines[1]).unwrap();
        assert!(json.get("prediction").is_none());
        assert_eq!(json["error"], "fit failed: training loss diverged");
    }

    #[test]
    fn test_json_summary_skips_empty_sections() {
        let summary = RunSummary {
            predictions: vec![PredictionLine::predicted("k-NN", Prediction::InvalidAudio)],
            ..Default::default()
        };
        let json = format_json(&summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("models").is_none());
        assert_eq!(value["predictions"][0]["prediction"], "invalid audio");
    }
}
