// src/dataset/balancer.rs
//
// Builds a class-balanced dataset from a folder-per-class corpus.
//
// Every class is filled up to the raw file count of the majority class:
// originals first, then augmented variants generated by cycling over the
// class's files. The number of cycles is bounded so an unusable class
// terminates with an exhaustion error instead of looping forever.

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::examples::{Dataset, ExampleOrigin, LabeledExample};
use super::labels::{ClassCounts, ClassLabels};
use crate::config::{BalanceConfig, ExhaustionPolicy};
use crate::core::{AudioAugmenter, AudioSample, Decoder, FeatureExtractor, FeatureVector};
use crate::error::{AugmentationExhaustionError, DatasetEmptyError, PipelineError};

/// Pipeline stage at which a file was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipStage {
    Decode,
    Extract,
}

impl fmt::Display for SkipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipStage::Decode => write!(f, "decode"),
            SkipStage::Extract => write!(f, "extract"),
        }
    }
}

/// A source file that contributed no original example
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub label: usize,
    pub stage: SkipStage,
    pub reason: String,
}

/// Output of [`DatasetBalancer::balance`]
#[derive(Debug, Clone)]
pub struct BalancedDataset {
    pub dataset: Dataset,
    /// Raw file count per class
    pub counts: ClassCounts,
    /// Label of the majority class
    pub majority: usize,
    /// Classes left short of the target (only under `ExhaustionPolicy::Continue`)
    pub shortfalls: Vec<AugmentationExhaustionError>,
    pub skipped: Vec<SkippedFile>,
    /// md5 over class names and sorted file names
    pub fingerprint: String,
}

impl BalancedDataset {
    /// Balancing target: the majority class's raw count
    pub fn target(&self) -> usize {
        self.counts.get(self.majority)
    }
}

/// Decoded source kept around for augmentation cycling
struct Source {
    path: PathBuf,
    audio: Option<AudioSample>,
}

/// Orchestrates decoding, extraction and augmentation across class folders
pub struct DatasetBalancer<'a> {
    decoder: &'a dyn Decoder,
    extractor: &'a FeatureExtractor,
    augmenter: AudioAugmenter,
    config: BalanceConfig,
}

impl<'a> DatasetBalancer<'a> {
    pub fn new(
        decoder: &'a dyn Decoder,
        extractor: &'a FeatureExtractor,
        augmenter: AudioAugmenter,
        config: BalanceConfig,
    ) -> Self {
        Self {
            decoder,
            extractor,
            augmenter,
            config,
        }
    }

    /// Balance the corpus under `root`, one subfolder per entry of `classes`
    pub fn balance(
        &mut self,
        classes: &ClassLabels,
        root: &Path,
    ) -> Result<BalancedDataset, PipelineError> {
        let mut class_files = Vec::with_capacity(classes.len());
        for (label, name) in classes.iter() {
            let dir = root.join(name);
            if !dir.is_dir() {
                return Err(DatasetEmptyError::MissingClassDir {
                    class: name.to_string(),
                    path: dir,
                }
                .into());
            }
            let files = list_audio_files(&dir, &self.config.extensions)?;
            debug!("Class {} ({}): {} files", label, name, files.len());
            class_files.push(files);
        }

        let counts = ClassCounts::new(class_files.iter().map(Vec::len).collect());
        let majority = counts.majority().ok_or(DatasetEmptyError::NoMajority)?;
        if let Some(empty) = counts.as_slice().iter().position(|&c| c == 0) {
            return Err(DatasetEmptyError::NoAudioFiles {
                class: classes.name(empty).unwrap_or_default().to_string(),
            }
            .into());
        }

        let target = counts.get(majority);
        info!(
            "Majority class: {} with {} samples",
            classes.name(majority).unwrap_or_default(),
            target
        );

        let progress = self.progress_bar((target * classes.len()) as u64);
        let mut dataset = Dataset::new(classes.clone());
        let mut shortfalls = Vec::new();
        let mut skipped = Vec::new();

        for (label, name) in classes.iter() {
            progress.set_message(name.to_string());
            let sources =
                self.collect_originals(label, &class_files[label], &mut dataset, &mut skipped);
            let originals = dataset.class_sizes()[label];
            progress.inc(originals as u64);
            info!("{}: {} of {} files usable", name, originals, class_files[label].len());

            let mut pool = originals;
            let mut passes = 0;
            if pool < target {
                (pool, passes) = self.augment_class(label, &sources, pool, target, &mut dataset, &progress);
                info!(
                    "{}: augmented {} -> {} in {} pass(es)",
                    name, originals, pool, passes
                );
            }

            if pool < target {
                let shortfall = AugmentationExhaustionError {
                    class: name.to_string(),
                    label,
                    reached: pool,
                    target,
                    passes,
                };
                match self.config.on_exhaustion {
                    ExhaustionPolicy::Abort => {
                        progress.abandon();
                        return Err(shortfall.into());
                    }
                    ExhaustionPolicy::Continue => {
                        warn!("{}", shortfall);
                        shortfalls.push(shortfall);
                    }
                }
            }

            if pool == 0 {
                progress.abandon();
                return Err(DatasetEmptyError::NoUsableFiles {
                    class: name.to_string(),
                }
                .into());
            }
        }
        progress.finish_and_clear();

        Ok(BalancedDataset {
            fingerprint: corpus_fingerprint(classes, &class_files),
            dataset,
            counts,
            majority,
            shortfalls,
            skipped,
        })
    }

    /// Decode and extract every file of one class in parallel, appending the
    /// successes in file order
    fn collect_originals(
        &self,
        label: usize,
        files: &[PathBuf],
        dataset: &mut Dataset,
        skipped: &mut Vec<SkippedFile>,
    ) -> Vec<Source> {
        let (decoder, extractor) = (self.decoder, self.extractor);

        let results: Vec<_> = files
            .par_iter()
            .map(|path| {
                let outcome = match decoder.decode(path) {
                    Err(e) => Err((SkipStage::Decode, e.to_string(), None)),
                    Ok(audio) => match extractor.extract(&audio) {
                        Ok(features) => Ok((audio, features)),
                        Err(e) => Err((SkipStage::Extract, e.to_string(), Some(audio))),
                    },
                };
                (path.clone(), outcome)
            })
            .collect();

        let mut sources = Vec::with_capacity(results.len());
        for (path, outcome) in results {
            match outcome {
                Ok((audio, features)) => {
                    dataset.push(LabeledExample {
                        features,
                        label,
                        origin: ExampleOrigin::Original,
                        source: path.clone(),
                    });
                    sources.push(Source {
                        path,
                        audio: Some(audio),
                    });
                }
                Err((stage, reason, audio)) => {
                    warn!("Skipping {} ({} failed): {}", path.display(), stage, reason);
                    skipped.push(SkippedFile {
                        path: path.clone(),
                        label,
                        stage,
                        reason,
                    });
                    // a waveform that fails extraction may still augment into usable variants
                    sources.push(Source { path, audio });
                }
            }
        }
        sources
    }

    /// Cycle over `sources` adding augmented rows until `target` or the pass
    /// bound is reached. Returns the final pool size and passes used.
    fn augment_class(
        &mut self,
        label: usize,
        sources: &[Source],
        mut pool: usize,
        target: usize,
        dataset: &mut Dataset,
        progress: &ProgressBar,
    ) -> (usize, usize) {
        let mut passes = 0;

        while pool < target && passes < self.config.max_passes {
            passes += 1;
            for source in sources {
                let Some(audio) = &source.audio else {
                    continue;
                };
                for variant in self.augmenter.augment(audio) {
                    let features = match variant.audio {
                        Ok(augmented) => self.extractor.extract(&augmented),
                        Err(e) => {
                            debug!("{} {} failed: {}", source.path.display(), variant.kind, e);
                            continue;
                        }
                    };
                    match features {
                        Ok(features) => {
                            dataset.push(augmented_example(features, label, variant.kind, &source.path));
                            pool += 1;
                            progress.inc(1);
                            if pool >= target {
                                return (pool, passes);
                            }
                        }
                        Err(e) => {
                            debug!("{} {} not extractable: {}", source.path.display(), variant.kind, e)
                        }
                    }
                }
            }
        }

        (pool, passes)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(total).with_style(style)
    }
}

fn augmented_example(
    features: FeatureVector,
    label: usize,
    kind: crate::core::AugmentKind,
    source: &Path,
) -> LabeledExample {
    LabeledExample {
        features,
        label,
        origin: ExampleOrigin::Augmented(kind),
        source: source.to_path_buf(),
    }
}

/// Audio files directly inside `dir`, sorted by path
pub fn list_audio_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, DatasetEmptyError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| DatasetEmptyError::Unreadable {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if matches {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Stable identifier for the corpus layout a model was trained on
pub fn corpus_fingerprint(classes: &ClassLabels, class_files: &[Vec<PathBuf>]) -> String {
    let mut context = md5::Context::new();
    for ((_, name), files) in classes.iter().zip(class_files) {
        context.consume(name.as_bytes());
        context.consume([0u8]);
        for file in files {
            if let Some(file_name) = file.file_name() {
                context.consume(file_name.to_string_lossy().as_bytes());
                context.consume([0u8]);
            }
        }
        context.consume([0xffu8]);
    }
    format!("{:x}", context.compute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_list_audio_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.WAV", "a.mp3", "notes.txt", "c.ogg", "d.m4a"] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let exts: Vec<String> = ["wav", "mp3", "m4a", "ogg"].iter().map(|s| s.to_string()).collect();
        let files = list_audio_files(dir.path(), &exts).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.WAV", "c.ogg", "d.m4a"]);
    }

    #[test]
    fn test_fingerprint_depends_on_layout() {
        let classes = ClassLabels::new(["a", "b"]).unwrap();
        let one = vec![vec![PathBuf::from("x/1.wav")], vec![PathBuf::from("y/2.wav")]];
        let two = vec![vec![PathBuf::from("x/1.wav"), PathBuf::from("y/2.wav")], vec![]];
        assert_eq!(corpus_fingerprint(&classes, &one), corpus_fingerprint(&classes, &one));
        assert_ne!(corpus_fingerprint(&classes, &one), corpus_fingerprint(&classes, &two));
    }
}
