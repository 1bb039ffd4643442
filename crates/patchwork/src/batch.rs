//! Parallel round-trip verification of preset directories.
//!
//! Each file goes through the same independent pipeline:
//!
//! 1. load the container ([`Stage::Load`])
//! 2. re-encode it and compare with the file bytes ([`Stage::Container`])
//! 3. cross-validate the embedded XML over the configured backends ([`Stage::Convert`])
//!
//! Files share nothing but the read-only [`BatchConfig`], so they are
//! processed with rayon and the results merged at the end. A failing file
//! never stops the batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use patchwork_fxp::PresetFile;
use patchwork_xml::{cross_validate, round_trip, Backend, BackendKind, SerializationPolicy};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Batch settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory searched recursively.
    pub root: PathBuf,
    /// File extension to match, without the dot (case-insensitive).
    pub extension: String,
    /// Backends every document is cross-validated with.
    pub backends: Vec<BackendKind>,
    pub policy: SerializationPolicy,
    /// Where to write before/after/JSON side files, if anywhere.
    pub dump_dir: Option<PathBuf>,
    /// Worker count; `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl BatchConfig {
    /// Default settings for a root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "fxp".to_string(),
            backends: BackendKind::ALL.to_vec(),
            policy: SerializationPolicy::default(),
            dump_dir: None,
            threads: None,
        }
    }

    fn backend_impls(&self) -> Vec<&'static dyn Backend> {
        self.backends.iter().map(|kind| kind.backend()).collect()
    }
}

/// Pipeline stage at which a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Reading or decoding the container.
    Load,
    /// Re-encoding the container did not reproduce the file.
    Container,
    /// XML conversion or round-trip verification.
    Convert,
    /// Writing diagnostic side files.
    Dump,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Container => "container",
            Self::Convert => "convert",
            Self::Dump => "dump",
        };
        f.write_str(name)
    }
}

/// One failed file.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub stage: Stage,
    pub message: String,
    /// Byte offset of the first difference, for mismatches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl FileFailure {
    fn new(path: &Path, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            stage,
            message: message.into(),
            offset: None,
        }
    }

    fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Result of processing one file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Passed(PathBuf),
    Failed(FileFailure),
}

impl FileOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Passed(_))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Passed(path) => path,
            Self::Failed(failure) => &failure.path,
        }
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub passed: usize,
    /// Failed files, sorted by path.
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    /// Whether every file passed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Find preset files below `root`, sorted by path.
pub fn find_presets(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    debug!(root = %root.display(), count = paths.len(), "found presets");
    Ok(paths)
}

/// Run the full pipeline on one file.
pub fn process_file(path: &Path, config: &BatchConfig) -> FileOutcome {
    match check_file(path, config) {
        Ok(()) => {
            debug!(path = %path.display(), "passed");
            FileOutcome::Passed(path.to_path_buf())
        }
        Err(failure) => {
            debug!(path = %path.display(), stage = %failure.stage, "failed: {}", failure.message);
            FileOutcome::Failed(failure)
        }
    }
}

fn check_file(path: &Path, config: &BatchConfig) -> std::result::Result<(), FileFailure> {
    let data = std::fs::read(path).map_err(|e| FileFailure::new(path, Stage::Load, e.to_string()))?;
    let preset = PresetFile::parse(&data).map_err(|e| FileFailure::new(path, Stage::Load, e.to_string()))?;

    let encoded = preset
        .to_bytes()
        .map_err(|e| FileFailure::new(path, Stage::Container, e.to_string()))?;
    if encoded != data {
        let offset = data
            .iter()
            .zip(&encoded)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| data.len().min(encoded.len()));
        return Err(FileFailure::new(
            path,
            Stage::Container,
            format!(
                "re-encoded container differs at byte {} ({} vs {} bytes)",
                offset,
                data.len(),
                encoded.len()
            ),
        )
        .at(offset));
    }

    if let Some(dir) = &config.dump_dir {
        dump(dir, path, &preset.xml, config).map_err(|e| FileFailure::new(path, Stage::Dump, e.to_string()))?;
    }

    cross_validate(&preset.xml, &config.backend_impls(), &config.policy).map_err(|e| {
        let failure = FileFailure::new(path, Stage::Convert, e.to_string());
        match e {
            patchwork_xml::Error::Mismatch { offset, .. } => failure.at(offset),
            _ => failure,
        }
    })?;

    Ok(())
}

/// Write `<stem>.before.xml`, `<stem>.after.xml` and `<stem>.json`.
///
/// The after/JSON files are skipped when the document does not parse.
fn dump(dir: &Path, path: &Path, xml: &str, config: &BatchConfig) -> Result<()> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "preset".to_string());

    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(format!("{}.before.xml", stem)), xml)?;

    let backend = config.backends.first().copied().unwrap_or_default().backend();
    match round_trip(xml, backend, &config.policy) {
        Ok(trip) => {
            std::fs::write(dir.join(format!("{}.after.xml", stem)), &trip.xml)?;
            let json = patchwork_xml::json::to_json_string(&trip.document)?;
            std::fs::write(dir.join(format!("{}.json", stem)), json)?;
        }
        Err(e) => warn!(path = %path.display(), "not dumping converted forms: {}", e),
    }

    Ok(())
}

/// Verify every preset below the configured root.
///
/// The progress callback receives `(completed, total)` counts. A config
/// without backends is rejected before any file is read.
pub fn run_batch<F>(config: &BatchConfig, mut progress: F) -> Result<BatchReport>
where
    F: FnMut(usize, usize) + Send,
{
    if config.backends.is_empty() {
        return Err(Error::Config("no backends configured".to_string()));
    }

    let paths = find_presets(&config.root, &config.extension)?;
    let total = paths.len();
    info!(total, root = %config.root.display(), "verifying presets");

    let completed = AtomicUsize::new(0);
    let progress = Mutex::new(&mut progress);

    let work = || -> Vec<FileOutcome> {
        paths
            .par_iter()
            .map(|path| {
                let outcome = process_file(path, config);

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(mut p) = progress.try_lock() {
                    (*p)(done, total);
                }

                outcome
            })
            .collect()
    };

    let outcomes = match config.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new().num_threads(threads).build()?.install(work),
        None => work(),
    };

    // Final progress update
    progress.lock()(total, total);

    let mut report = BatchReport {
        total,
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome {
            FileOutcome::Passed(_) => report.passed += 1,
            FileOutcome::Failed(failure) => report.failures.push(failure),
        }
    }
    report.failures.sort_by(|a, b| a.path.cmp(&b.path));

    info!(total, passed = report.passed, failed = report.failures.len(), "batch finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BatchConfig::new("/presets");
        assert_eq!(config.extension, "fxp");
        assert_eq!(config.backends, BackendKind::ALL);
        assert!(config.dump_dir.is_none());
    }

    #[test]
    fn test_stage_serializes_lowercase() {
        let failure = FileFailure::new(Path::new("a.fxp"), Stage::Container, "differs").at(3);
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["stage"], "container");
        assert_eq!(json["offset"], 3);

        let failure = FileFailure::new(Path::new("a.fxp"), Stage::Load, "short");
        let json = serde_json::to_value(&failure).unwrap();
        assert!(json.get("offset").is_none());
    }

    #[test]
    fn test_missing_file_fails_at_load() {
        let outcome = process_file(Path::new("/nonexistent/preset.fxp"), &BatchConfig::new("/nonexistent"));
        match outcome {
            FileOutcome::Failed(failure) => assert_eq!(failure.stage, Stage::Load),
            FileOutcome::Passed(_) => panic!("missing file passed"),
        }
    }
}
