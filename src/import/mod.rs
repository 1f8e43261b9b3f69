//! Format normalizers for workout history ingestion.
//!
//! A closed set of input variants, one normalizer per source format. Adding
//! a format means one new variant and one new normalizer, never touching the
//! existing ones. Batch imports run per-file in parallel; files are fully
//! independent and share no mutable state.

use crate::error::{ImportWarning, Result, StrideError};
use crate::models::WorkoutRecord;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod csv;
pub mod fit;
pub mod gpx;

/// Output of normalizing one file: the records that parsed plus any
/// record-level rejects.
#[derive(Debug, Default)]
pub struct NormalizedFile {
    pub records: Vec<WorkoutRecord>,
    pub warnings: Vec<ImportWarning>,
}

/// One source-format normalizer
pub trait Normalizer: Send + Sync {
    /// Whether this normalizer handles the given file
    fn can_import(&self, path: &Path) -> bool;

    /// Normalize the file into canonical workout records
    fn normalize(&self, path: &Path) -> Result<NormalizedFile>;

    /// Short format name for logs and messages
    fn format_name(&self) -> &'static str;
}

/// Outcome of a batch import across many files
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<WorkoutRecord>,
    pub warnings: Vec<ImportWarning>,

    /// Files that failed at the file level, with the failure reason
    pub failed_files: Vec<(PathBuf, String)>,
}

/// Dispatches files to the normalizer for their format
pub struct ImportManager {
    normalizers: Vec<Box<dyn Normalizer>>,
}

impl ImportManager {
    pub fn new() -> Self {
        let normalizers: Vec<Box<dyn Normalizer>> = vec![
            Box::new(csv::CsvNormalizer::new()),
            Box::new(gpx::GpxNormalizer::new()),
            Box::new(fit::FitNormalizer::new()),
        ];

        Self { normalizers }
    }

    /// Normalize a single file, auto-detecting the format
    pub fn import_file(&self, path: &Path) -> Result<NormalizedFile> {
        for normalizer in &self.normalizers {
            if normalizer.can_import(path) {
                info!(file = %path.display(), format = normalizer.format_name(), "importing");
                return normalizer.normalize(path);
            }
        }

        Err(StrideError::Parse {
            file: path.to_path_buf(),
            reason: "no normalizer for this file type".to_string(),
        })
    }

    /// Import a batch of files in parallel, one worker per file.
    ///
    /// A file-level failure is recorded against that file only; the rest of
    /// the batch still imports.
    pub fn import_batch(&self, paths: &[PathBuf]) -> BatchOutcome {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let results: Vec<(PathBuf, Result<NormalizedFile>)> = paths
            .par_iter()
            .map(|path| {
                let result = self.import_file(path);
                pb.inc(1);
                (path.clone(), result)
            })
            .collect();

        pb.finish_and_clear();

        let mut outcome = BatchOutcome::default();
        for (path, result) in results {
            match result {
                Ok(mut normalized) => {
                    outcome.records.append(&mut normalized.records);
                    outcome.warnings.append(&mut normalized.warnings);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "file import failed");
                    outcome.failed_files.push((path, e.to_string()));
                }
            }
        }

        outcome
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}
