//! End-to-end run: detect duplicates, then preview or quarantine them.
//!
//! [`Pipeline::detect`] runs enumeration, size grouping, hashing, digest
//! grouping and keeper selection. The resulting [`Detection`] can be turned
//! into a dry-run report with [`Pipeline::preview`] or carried out with
//! [`Pipeline::apply`], which moves copies into quarantine, appends them to
//! the restore manifest and writes `dedup-report.md`.
//!
//! The configuration is an immutable [`PipelineConfig`] value; nothing in
//! the run reads global state.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::actions::{MoveError, QuarantineMover};
use crate::duplicates::{
    select_keepers, DuplicateFinder, FinderConfig, FinderError, RetentionDecision, ScanSummary,
    DEFAULT_IO_THREADS,
};
use crate::manifest::Manifest;
use crate::output::{
    MarkdownReport, ReportBuilder, RunMode, RunReport, Stage, Warning, REPORT_FILE_NAME,
};
use crate::progress::ProgressCallback;
use crate::scanner::{normalize_extensions, EnumeratorConfig, ScanError, DEFAULT_EXTENSIONS};

/// Immutable settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directories to scan
    pub roots: Vec<PathBuf>,
    /// Lowercase extensions without a dot
    pub extensions: BTreeSet<String>,
    /// Smallest candidate size in bytes
    pub min_size: u64,
    /// Where removed copies go
    pub quarantine_dir: PathBuf,
    /// Gitignore-style exclude patterns
    pub exclude: Vec<String>,
    /// Hashing threads
    pub io_threads: usize,
}

impl PipelineConfig {
    /// Settings with the default extensions, minimum size and thread count.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, quarantine_dir: PathBuf) -> Self {
        Self {
            roots,
            extensions: normalize_extensions(DEFAULT_EXTENSIONS),
            min_size: 1,
            quarantine_dir,
            exclude: Vec::new(),
            io_threads: DEFAULT_IO_THREADS,
        }
    }

    /// Replace the accepted extensions. Case and leading dots are ignored.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = normalize_extensions(extensions);
        self
    }

    /// Set the smallest file size, in bytes, that is considered.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Replace the gitignore-style patterns pruned from the walk.
    #[must_use]
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    /// Set the hashing thread count, at least one.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Finder settings for this run. The quarantine directory is always
    /// excluded from enumeration.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        let enumerator = EnumeratorConfig::default()
            .with_extensions(self.extensions.iter())
            .with_min_size(self.min_size)
            .with_exclude_patterns(self.exclude.clone())
            .with_excluded_dir(self.quarantine_dir.clone());

        FinderConfig::default()
            .with_roots(self.roots.clone())
            .with_enumerator_config(enumerator)
            .with_io_threads(self.io_threads)
    }
}

/// Run-level failures. Per-file problems are warnings in the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// None of the configured roots could be scanned.
    #[error("No reachable root directory ({count} configured)")]
    NoReachableRoots {
        /// Number of roots configured
        count: usize,
        /// Why each root was rejected
        errors: Vec<ScanError>,
    },

    /// The quarantine directory could not be created.
    #[error("Cannot create quarantine directory: {0}")]
    QuarantineDir(#[source] MoveError),

    /// The report could not be written.
    #[error("Failed to write report to {path}: {source}")]
    Report {
        /// Destination of the report
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Ctrl+C stopped the run before anything was moved.
    #[error("Run interrupted by user")]
    Interrupted,
}

impl From<FinderError> for PipelineError {
    fn from(err: FinderError) -> Self {
        match err {
            FinderError::NoReachableRoots { count, errors } => {
                Self::NoReachableRoots { count, errors }
            }
            FinderError::Interrupted => Self::Interrupted,
        }
    }
}

/// Keeper decisions for every confirmed duplicate group.
#[derive(Debug)]
pub struct Detection {
    /// One decision per group, largest reclaimable first
    pub decisions: Vec<RetentionDecision>,
    /// Scan statistics and warnings
    pub summary: ScanSummary,
}

impl Detection {
    /// Number of copies selected for quarantine.
    #[must_use]
    pub fn files_to_move(&self) -> usize {
        self.decisions.iter().map(|d| d.removed.len()).sum()
    }

    /// Bytes freed if every selected copy is moved.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.decisions
            .iter()
            .map(RetentionDecision::reclaimable_bytes)
            .sum()
    }

    /// Whether any duplicate group was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Duplicate detection and quarantine for one configuration.
pub struct Pipeline {
    config: PipelineConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Pipeline {
    /// Pipeline without a shutdown flag or progress reporting.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Share a shutdown flag with every stage.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report phase progress to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Settings this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Find duplicate groups and select a keeper for each.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoReachableRoots`] when no root can be
    /// scanned and [`PipelineError::Interrupted`] on Ctrl+C.
    pub fn detect(&self) -> Result<Detection, PipelineError> {
        let mut finder_config = self.config.finder_config();
        if let Some(flag) = &self.shutdown_flag {
            finder_config = finder_config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(callback) = &self.progress {
            finder_config = finder_config.with_progress_callback(Arc::clone(callback));
        }

        let (groups, summary) = DuplicateFinder::new(finder_config).find_duplicates()?;
        let decisions = select_keepers(groups);
        log::info!(
            "Selected keepers for {} groups, {} copies to move",
            decisions.len(),
            decisions.iter().map(|d| d.removed.len()).sum::<usize>()
        );

        Ok(Detection { decisions, summary })
    }

    /// Dry-run report for a detection. Nothing is touched on disk.
    #[must_use]
    pub fn preview(&self, detection: &Detection, generated_at: DateTime<Utc>) -> RunReport {
        let mut builder = ReportBuilder::new(RunMode::DryRun, &self.config.quarantine_dir);
        builder.record_scan(&detection.summary);
        for decision in &detection.decisions {
            builder.record_planned(decision);
        }
        builder.finish(generated_at)
    }

    /// Move every selected copy into quarantine and write the report and
    /// manifest there.
    ///
    /// Per-file failures, and failures to save the manifest or report, are
    /// warnings in the returned report. Ctrl+C stops before the next file
    /// and the report covers what was moved.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::QuarantineDir`] if the quarantine directory
    /// cannot be created.
    pub fn apply(
        &self,
        detection: &Detection,
        generated_at: DateTime<Utc>,
    ) -> Result<RunReport, PipelineError> {
        let mut mover = QuarantineMover::create(&self.config.quarantine_dir)
            .map_err(PipelineError::QuarantineDir)?;
        if let Some(flag) = &self.shutdown_flag {
            mover = mover.with_shutdown_flag(Arc::clone(flag));
        }
        let quarantine_dir = mover.dir().to_path_buf();

        let mut builder = ReportBuilder::new(RunMode::Apply, &quarantine_dir);
        builder.record_scan(&detection.summary);
        for decision in &detection.decisions {
            builder.record_planned(decision);
        }

        let manifest = match Manifest::load_or_new(&quarantine_dir) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                builder.warn(Warning::new(
                    Stage::Manifest,
                    Some(&Manifest::path_in(&quarantine_dir)),
                    format!("Existing manifest left untouched: {:#}", e),
                ));
                None
            }
        };

        log::info!(
            "Moving {} duplicate copies into {}",
            detection.files_to_move(),
            quarantine_dir.display()
        );
        if let Some(callback) = &self.progress {
            callback.on_phase_start("move", detection.files_to_move());
        }

        let mut moved = Vec::new();
        let mut attempted = 0;
        for decision in &detection.decisions {
            if self.is_shutdown_requested() {
                log::info!("Shutdown requested, leaving remaining duplicates in place");
                builder.mark_interrupted();
                break;
            }

            let batch = mover.quarantine_decision(decision);
            attempted += batch.moved.len() + batch.failures.len();
            if let Some(callback) = &self.progress {
                callback.on_progress(attempted, &decision.keeper.path.to_string_lossy());
                for entry in &batch.moved {
                    callback.on_item_completed(entry.size);
                }
            }
            builder.record_moves(decision, &batch);
            moved.extend(batch.moved);
        }

        if let Some(callback) = &self.progress {
            callback.on_phase_end("move");
        }
        let stats = mover.stats();
        log::info!(
            "Move complete: {} moved, {} failed",
            stats.files_moved,
            stats.failures
        );

        if let Some(mut manifest) = manifest {
            if !moved.is_empty() {
                manifest.append(moved, generated_at);
                let path = Manifest::path_in(&quarantine_dir);
                if let Err(e) = manifest.save(&path) {
                    builder.warn(Warning::new(
                        Stage::Manifest,
                        Some(&path),
                        format!("Failed to save manifest: {:#}", e),
                    ));
                }
            }
        }

        let mut report = builder.finish(generated_at);
        if let Err(e) = write_report(&report, &quarantine_dir) {
            log::warn!("{}", e);
            report
                .warnings
                .push(Warning::new(Stage::Report, None, e.to_string()));
            report.summary.warnings = report.warnings.len();
        }

        Ok(report)
    }
}

/// Write `report` as markdown into `dir`, returning the file path.
///
/// # Errors
///
/// Returns [`PipelineError::Report`] if the file cannot be written.
pub fn write_report(report: &RunReport, dir: &Path) -> Result<PathBuf, PipelineError> {
    let path = dir.join(REPORT_FILE_NAME);
    fs::write(&path, MarkdownReport::new(report).render()).map_err(|source| {
        PipelineError::Report {
            path: path.clone(),
            source,
        }
    })?;
    log::info!("Report written to {}", path.display());
    Ok(path)
}

/// Detect and, for [`RunMode::Apply`], quarantine in one call.
///
/// # Errors
///
/// See [`Pipeline::detect`] and [`Pipeline::apply`].
pub fn run_pipeline(
    config: PipelineConfig,
    mode: RunMode,
    shutdown_flag: Option<Arc<AtomicBool>>,
) -> Result<RunReport, PipelineError> {
    let mut pipeline = Pipeline::new(config);
    if let Some(flag) = shutdown_flag {
        pipeline = pipeline.with_shutdown_flag(flag);
    }

    let detection = pipeline.detect()?;
    match mode {
        RunMode::DryRun => Ok(pipeline.preview(&detection, Utc::now())),
        RunMode::Apply => pipeline.apply(&detection, Utc::now()),
    }
}
