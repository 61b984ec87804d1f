//! Run report model.
//!
//! [`ReportBuilder`] collects one [`GroupReport`] per processed duplicate
//! group together with every warning raised along the way, and
//! [`ReportBuilder::finish`] freezes them into a [`RunReport`] that the
//! markdown and JSON formatters render.
//!
//! Groups are ordered by descending reclaimable bytes, then ascending
//! digest, so two runs over unchanged input produce the same report.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::{MoveBatch, MoveError};
use crate::duplicates::{RetentionDecision, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::{Digest, HashError, ScanError};

/// Pipeline stage a warning came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Walking the roots
    Enumerate,
    /// Reading file content
    Hash,
    /// Relocating into quarantine
    Move,
    /// Writing the report
    Report,
    /// Updating the restore manifest
    Manifest,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enumerate => "enumerate",
            Self::Hash => "hash",
            Self::Move => "move",
            Self::Report => "report",
            Self::Manifest => "manifest",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem recorded during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Stage that raised it
    pub stage: Stage,
    /// File or directory involved, if any
    pub path: Option<PathBuf>,
    /// Human-readable description
    pub message: String,
}

impl Warning {
    /// Create a warning for `stage`.
    #[must_use]
    pub fn new(stage: Stage, path: Option<&Path>, message: impl Into<String>) -> Self {
        Self {
            stage,
            path: path.map(Path::to_path_buf),
            message: message.into(),
        }
    }

    /// Warning for a file or root the walk could not use.
    #[must_use]
    pub fn from_scan_error(err: &ScanError) -> Self {
        Self::new(Stage::Enumerate, Some(err.path()), err.to_string())
    }

    /// Warning for a candidate that could not be hashed.
    #[must_use]
    pub fn from_hash_error(err: &HashError) -> Self {
        Self::new(Stage::Hash, Some(err.path()), err.to_string())
    }

    /// Warning for a duplicate left in place because its move failed.
    #[must_use]
    pub fn from_move_error(err: &MoveError) -> Self {
        Self::new(Stage::Move, Some(err.path()), err.to_string())
    }
}

/// Whether the run only planned moves or carried them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Preview only, nothing was moved
    DryRun,
    /// Duplicates were relocated into quarantine
    Apply,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => f.write_str("dry run"),
            Self::Apply => f.write_str("apply"),
        }
    }
}

/// A completed relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedFile {
    /// Original location
    pub from: PathBuf,
    /// Location inside quarantine
    pub to: PathBuf,
}

/// A relocation that did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMove {
    /// The copy that stayed in place
    pub path: PathBuf,
    /// Why it stayed
    pub reason: String,
}

/// Outcome of one duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    /// Content digest shared by every member
    pub digest: Digest,
    /// Size of each member in bytes
    pub size: u64,
    /// The copy left in place
    pub keeper: PathBuf,
    /// Copies selected for quarantine, in retention order
    pub planned: Vec<PathBuf>,
    /// Copies actually moved
    pub moved: Vec<MovedFile>,
    /// Copies whose move failed
    pub failed: Vec<FailedMove>,
    /// `size` times the number of moved copies
    pub bytes_reclaimed: u64,
    /// `size` times the number of planned copies
    pub bytes_reclaimable: u64,
}

impl GroupReport {
    fn planned_from(decision: &RetentionDecision) -> Self {
        Self {
            digest: decision.digest,
            size: decision.size,
            keeper: decision.keeper.path.clone(),
            planned: decision.removed_paths(),
            moved: Vec::new(),
            failed: Vec::new(),
            bytes_reclaimed: 0,
            bytes_reclaimable: decision.reclaimable_bytes(),
        }
    }
}

/// Totals for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Candidate files found under the roots
    pub files_scanned: usize,
    /// Confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Copies selected for quarantine
    pub files_to_move: usize,
    /// Copies actually moved
    pub files_moved: usize,
    /// Copies whose move failed
    pub move_failures: usize,
    /// Bytes moved into quarantine
    pub bytes_reclaimed: u64,
    /// Bytes that moving every planned copy would free
    pub bytes_reclaimable: u64,
    /// Number of warnings
    pub warnings: usize,
    /// Whether Ctrl+C cut the run short
    pub interrupted: bool,
}

/// Frozen report for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Preview or apply
    pub mode: RunMode,
    /// Roots that were scanned
    pub roots: Vec<PathBuf>,
    /// Destination of relocated copies
    pub quarantine_dir: PathBuf,
    /// Totals
    pub summary: ReportSummary,
    /// One entry per duplicate group
    pub groups: Vec<GroupReport>,
    /// Every warning, in the order raised
    pub warnings: Vec<Warning>,
}

impl RunReport {
    /// Exit code matching this outcome.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.summary.interrupted {
            ExitCode::Interrupted
        } else if self.groups.is_empty() {
            ExitCode::NoDuplicates
        } else if !self.warnings.is_empty() {
            ExitCode::PartialSuccess
        } else {
            ExitCode::Success
        }
    }

    /// Human-readable reclaimed or reclaimable total, depending on mode.
    #[must_use]
    pub fn space_display(&self) -> String {
        match self.mode {
            RunMode::DryRun => ByteSize(self.summary.bytes_reclaimable).to_string(),
            RunMode::Apply => ByteSize(self.summary.bytes_reclaimed).to_string(),
        }
    }
}

/// Accumulates the outcome of a run.
#[derive(Debug)]
pub struct ReportBuilder {
    mode: RunMode,
    quarantine_dir: PathBuf,
    roots: Vec<PathBuf>,
    files_scanned: usize,
    groups: BTreeMap<Digest, GroupReport>,
    warnings: Vec<Warning>,
    interrupted: bool,
}

impl ReportBuilder {
    /// Empty report for a run in `mode` against `quarantine_dir`.
    #[must_use]
    pub fn new(mode: RunMode, quarantine_dir: &Path) -> Self {
        Self {
            mode,
            quarantine_dir: quarantine_dir.to_path_buf(),
            roots: Vec::new(),
            files_scanned: 0,
            groups: BTreeMap::new(),
            warnings: Vec::new(),
            interrupted: false,
        }
    }

    /// Take the roots, file count and enumeration/hash warnings of a scan.
    pub fn record_scan(&mut self, summary: &ScanSummary) {
        self.roots.clone_from(&summary.roots);
        self.files_scanned = summary.total_files;
        self.warnings
            .extend(summary.scan_errors.iter().map(Warning::from_scan_error));
        self.warnings
            .extend(summary.hash_errors.iter().map(Warning::from_hash_error));
    }

    /// Register the keeper and planned moves of a group.
    pub fn record_planned(&mut self, decision: &RetentionDecision) {
        self.groups
            .entry(decision.digest)
            .or_insert_with(|| GroupReport::planned_from(decision));
    }

    /// Register what the mover did with a group.
    pub fn record_moves(&mut self, decision: &RetentionDecision, batch: &MoveBatch) {
        self.record_planned(decision);
        let Some(group) = self.groups.get_mut(&decision.digest) else {
            return;
        };

        for entry in &batch.moved {
            group.moved.push(MovedFile {
                from: entry.original_path.clone(),
                to: entry.quarantined_path.clone(),
            });
            group.bytes_reclaimed += entry.size;
        }
        for err in &batch.failures {
            group.failed.push(FailedMove {
                path: err.path().to_path_buf(),
                reason: err.to_string(),
            });
            self.warnings.push(Warning::from_move_error(err));
        }
        if batch.interrupted {
            self.interrupted = true;
        }
    }

    /// Record a warning outside the per-group flow.
    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Note that Ctrl+C stopped the run.
    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    /// Warnings recorded so far.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Freeze into a report stamped with `generated_at`.
    #[must_use]
    pub fn finish(self, generated_at: DateTime<Utc>) -> RunReport {
        let mut groups: Vec<GroupReport> = self.groups.into_values().collect();
        groups.sort_by(|a, b| {
            b.bytes_reclaimable
                .cmp(&a.bytes_reclaimable)
                .then_with(|| a.digest.cmp(&b.digest))
        });

        let summary = ReportSummary {
            files_scanned: self.files_scanned,
            duplicate_groups: groups.len(),
            files_to_move: groups.iter().map(|g| g.planned.len()).sum(),
            files_moved: groups.iter().map(|g| g.moved.len()).sum(),
            move_failures: groups.iter().map(|g| g.failed.len()).sum(),
            bytes_reclaimed: groups.iter().map(|g| g.bytes_reclaimed).sum(),
            bytes_reclaimable: groups.iter().map(|g| g.bytes_reclaimable).sum(),
            warnings: self.warnings.len(),
            interrupted: self.interrupted,
        };

        RunReport {
            generated_at,
            mode: self.mode,
            roots: self.roots,
            quarantine_dir: self.quarantine_dir,
            summary,
            groups,
            warnings: self.warnings,
        }
    }
}
