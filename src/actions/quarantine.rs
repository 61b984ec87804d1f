//! Relocation of duplicate copies into the quarantine directory.
//!
//! # Overview
//!
//! Nothing is ever deleted. Each removed copy is moved into one flat
//! quarantine directory under its own file name; when that name is taken,
//! `_1`, `_2`, ... is inserted before the extension. The destination is
//! reserved with an exclusive create before the move, so two moves in one
//! run and any file already in quarantine can never share a name. The names
//! of the run report and the manifest are never handed out, since those
//! files are rewritten in place after every run.
//!
//! The move itself is a rename. If the quarantine directory sits on a
//! different filesystem the rename fails with a cross-device error and the
//! file is copied, synced, verified against the recorded size and digest,
//! and only then removed from its original location.
//!
//! # Example
//!
//! ```no_run
//! use wechat_dedup::actions::quarantine::QuarantineMover;
//! use std::path::Path;
//!
//! let mut mover = QuarantineMover::create(Path::new("/home/me/WeChat-Duplicates")).unwrap();
//! # let record = wechat_dedup::scanner::FileRecord::new(
//! #     "/a.pdf".into(), 1, std::time::SystemTime::now());
//! match mover.quarantine(&record) {
//!     Ok(entry) => println!("Moved to {}", entry.quarantined_path.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::ffi::{OsStr, OsString};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::RetentionDecision;
use crate::manifest::{MANIFEST_FILE_NAME, MANIFEST_TMP_FILE_NAME};
use crate::output::REPORT_FILE_NAME;
use crate::scanner::{Digest, FileRecord, Hasher};

/// Highest collision suffix tried before giving up on a name.
pub const MAX_SUFFIX: u32 = 10_000;

/// Files the run writes into quarantine itself.
const RESERVED_NAMES: [&str; 3] = [REPORT_FILE_NAME, MANIFEST_FILE_NAME, MANIFEST_TMP_FILE_NAME];

/// Error type for relocation.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The source no longer exists.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied reading, creating or removing a file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The source changed size since it was scanned.
    #[error("file modified since scan: {path} (size {expected} -> {actual})")]
    Modified {
        /// Path of the changed file
        path: PathBuf,
        /// Size recorded at scan time
        expected: u64,
        /// Size found now
        actual: u64,
    },

    /// The destination path is already taken.
    #[error("destination already exists: {0}")]
    Occupied(PathBuf),

    /// Every suffixed variant of the name is taken.
    #[error("no free name for {name} in {dir}")]
    NoFreeName {
        /// Quarantine directory
        dir: PathBuf,
        /// Original file name
        name: String,
    },

    /// A cross-device copy did not match the recorded file.
    #[error("copy verification failed for {path}: {reason}")]
    VerificationFailed {
        /// Source path
        path: PathBuf,
        /// What did not match
        reason: String,
    },

    /// The copy was made but the original could not be removed; the copy
    /// has been deleted again.
    #[error("could not remove original {path} after copying: {source}")]
    SourceNotRemoved {
        /// Source path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl MoveError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Self::Occupied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Occupied(p) => p,
            Self::Modified { path, .. }
            | Self::VerificationFailed { path, .. }
            | Self::SourceNotRemoved { path, .. }
            | Self::Io { path, .. } => path,
            Self::NoFreeName { dir, .. } => dir,
        }
    }
}

/// Record of one completed relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// Where the file was found
    pub original_path: PathBuf,
    /// Where it lives now
    pub quarantined_path: PathBuf,
    /// Content digest at scan time
    pub digest: Digest,
    /// Size in bytes
    pub size: u64,
}

/// Outcome of relocating the removed copies of one group.
#[derive(Debug, Default)]
pub struct MoveBatch {
    /// Completed relocations, in retention order
    pub moved: Vec<QuarantineEntry>,
    /// Copies left in place, one error each
    pub failures: Vec<MoveError>,
    /// Bytes actually moved into quarantine
    pub bytes_reclaimed: u64,
    /// Whether shutdown stopped the batch before every copy was tried
    pub interrupted: bool,
}

impl MoveBatch {
    /// Whether every attempted relocation succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Quarantined {} file(s), reclaimed {} bytes",
                self.moved.len(),
                self.bytes_reclaimed
            )
        } else {
            format!(
                "Quarantined {} file(s), {} failed, reclaimed {} bytes",
                self.moved.len(),
                self.failures.len(),
                self.bytes_reclaimed
            )
        }
    }
}

/// Running totals for one mover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoverStats {
    /// Files relocated
    pub files_moved: usize,
    /// Bytes relocated
    pub bytes_moved: u64,
    /// Relocations that failed
    pub failures: usize,
}

/// Sequential mover into one quarantine directory.
#[derive(Debug)]
pub struct QuarantineMover {
    dir: PathBuf,
    hasher: Hasher,
    shutdown_flag: Option<Arc<AtomicBool>>,
    stats: MoverStats,
}

impl QuarantineMover {
    /// Create the quarantine directory if needed and open a mover on it.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError`] if the directory cannot be created or the path
    /// exists and is not a directory.
    pub fn create(dir: &Path) -> Result<Self, MoveError> {
        fs::create_dir_all(dir).map_err(|e| MoveError::from_io(dir, e))?;
        let dir = dir.canonicalize().map_err(|e| MoveError::from_io(dir, e))?;
        log::debug!("Quarantine directory ready: {}", dir.display());

        Ok(Self {
            dir,
            hasher: Hasher::new(),
            shutdown_flag: None,
            stats: MoverStats::default(),
        })
    }

    /// Set the shutdown flag checked before each file.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The canonical quarantine directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Totals so far.
    #[must_use]
    pub fn stats(&self) -> MoverStats {
        self.stats
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Relocate one file into quarantine.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError`] if the source vanished or changed size, no
    /// destination name is free, or the move fails. The source is left in
    /// place on every error.
    pub fn quarantine(&mut self, record: &FileRecord) -> Result<QuarantineEntry, MoveError> {
        let result = self.quarantine_inner(record);
        match &result {
            Ok(entry) => {
                self.stats.files_moved += 1;
                self.stats.bytes_moved += entry.size;
                log::debug!(
                    "Quarantined {} -> {}",
                    entry.original_path.display(),
                    entry.quarantined_path.display()
                );
            }
            Err(e) => {
                self.stats.failures += 1;
                log::warn!("Failed to quarantine {}: {}", record.path.display(), e);
            }
        }
        result
    }

    fn quarantine_inner(&self, record: &FileRecord) -> Result<QuarantineEntry, MoveError> {
        let digest = record.digest().ok_or_else(|| MoveError::VerificationFailed {
            path: record.path.clone(),
            reason: "no digest recorded".to_string(),
        })?;

        check_unchanged(&record.path, record.size)?;

        let file_name = record
            .path
            .file_name()
            .ok_or_else(|| MoveError::NotFound(record.path.clone()))?;
        let destination = reserve_destination(&self.dir, file_name)?;

        relocate(&record.path, &destination, record.size, digest, &self.hasher)?;

        Ok(QuarantineEntry {
            original_path: record.path.clone(),
            quarantined_path: destination,
            digest,
            size: record.size,
        })
    }

    /// Relocate every removed copy of a group, in retention order.
    ///
    /// A failure does not stop later files. Shutdown stops the batch
    /// before the next file.
    pub fn quarantine_decision(&mut self, decision: &RetentionDecision) -> MoveBatch {
        let mut batch = MoveBatch::default();

        for record in &decision.removed {
            if self.is_shutdown_requested() {
                log::info!("Shutdown requested, leaving remaining duplicates in place");
                batch.interrupted = true;
                break;
            }
            match self.quarantine(record) {
                Ok(entry) => {
                    batch.bytes_reclaimed += entry.size;
                    batch.moved.push(entry);
                }
                Err(e) => batch.failures.push(e),
            }
        }

        batch
    }
}

/// Fail if `path` is gone or its size differs from `expected`.
///
/// # Errors
///
/// Returns [`MoveError::NotFound`], [`MoveError::Modified`] or an I/O error.
pub fn check_unchanged(path: &Path, expected: u64) -> Result<(), MoveError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| MoveError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(MoveError::NotFound(path.to_path_buf()));
    }
    if metadata.len() != expected {
        return Err(MoveError::Modified {
            path: path.to_path_buf(),
            expected,
            actual: metadata.len(),
        });
    }
    Ok(())
}

/// `name.ext` with `_n` inserted before the extension.
///
/// Names without an extension get the suffix at the end.
#[must_use]
pub fn suffixed_name(file_name: &OsStr, n: u32) -> OsString {
    let path = Path::new(file_name);
    let mut name = path
        .file_stem()
        .map_or_else(|| file_name.to_os_string(), OsStr::to_os_string);
    name.push(format!("_{n}"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Claim a free name for `file_name` inside `dir` by creating it empty.
///
/// Tries the plain name first, then `_1`, `_2`, ... up to [`MAX_SUFFIX`].
/// Names owned by the report and the manifest are skipped.
///
/// # Errors
///
/// Returns [`MoveError::NoFreeName`] when every candidate is taken, or an
/// I/O error if the directory cannot be written.
pub fn reserve_destination(dir: &Path, file_name: &OsStr) -> Result<PathBuf, MoveError> {
    for n in 0..=MAX_SUFFIX {
        let candidate = if n == 0 {
            dir.join(file_name)
        } else {
            dir.join(suffixed_name(file_name, n))
        };
        if candidate.file_name().is_some_and(is_reserved_name) {
            continue;
        }

        match reserve_exact(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(MoveError::from_io(&candidate, e)),
        }
    }

    Err(MoveError::NoFreeName {
        dir: dir.to_path_buf(),
        name: file_name.to_string_lossy().into_owned(),
    })
}

/// Whether `name` belongs to a file the run itself writes into quarantine.
///
/// Compared without ASCII case, as the quarantine may sit on a
/// case-insensitive filesystem.
#[must_use]
pub fn is_reserved_name(name: &OsStr) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
}

/// Create `path` empty, failing if anything already exists there.
///
/// # Errors
///
/// Returns `AlreadyExists` if the path is taken, or any other I/O error.
pub fn reserve_exact(path: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(drop)
}

/// Whether a rename failed because source and destination are on different
/// filesystems.
///
/// Falls back to the raw code (EXDEV on POSIX, ERROR_NOT_SAME_DEVICE on
/// Windows) for errors built without a kind.
#[must_use]
pub fn is_cross_device_error(err: &io::Error) -> bool {
    #[cfg(windows)]
    const CROSS_DEVICE: i32 = 17;
    #[cfg(not(windows))]
    const CROSS_DEVICE: i32 = 18;
    err.kind() == io::ErrorKind::CrossesDevices || err.raw_os_error() == Some(CROSS_DEVICE)
}

/// Move `src` onto the reserved placeholder `dest`.
///
/// On any failure the placeholder is removed and `src` stays in place.
pub(crate) fn relocate(
    src: &Path,
    dest: &Path,
    size: u64,
    digest: Digest,
    hasher: &Hasher,
) -> Result<(), MoveError> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            log::debug!(
                "{} is on another device, copying instead of renaming",
                dest.display()
            );
            copy_verified(src, dest, size, digest, hasher)
        }
        Err(e) => {
            discard(dest);
            Err(MoveError::from_io(src, e))
        }
    }
}

/// Copy, sync, verify, then remove the source. Undoes the copy on failure.
pub(crate) fn copy_verified(
    src: &Path,
    dest: &Path,
    size: u64,
    digest: Digest,
    hasher: &Hasher,
) -> Result<(), MoveError> {
    if let Err(e) = fs::copy(src, dest) {
        discard(dest);
        return Err(MoveError::from_io(src, e));
    }

    let verified = OpenOptions::new()
        .write(true)
        .open(dest)
        .and_then(|f| f.sync_all())
        .map_err(|e| MoveError::from_io(dest, e))
        .and_then(|()| verify_copy(src, dest, size, digest, hasher));
    if let Err(e) = verified {
        discard(dest);
        return Err(e);
    }

    if let Err(e) = fs::remove_file(src) {
        discard(dest);
        return Err(MoveError::SourceNotRemoved {
            path: src.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

fn verify_copy(
    src: &Path,
    dest: &Path,
    size: u64,
    digest: Digest,
    hasher: &Hasher,
) -> Result<(), MoveError> {
    let copied = fs::metadata(dest)
        .map_err(|e| MoveError::from_io(dest, e))?
        .len();
    if copied != size {
        return Err(MoveError::VerificationFailed {
            path: src.to_path_buf(),
            reason: format!("copied {copied} bytes, expected {size}"),
        });
    }

    let actual = hasher.digest_file(dest).map_err(|e| MoveError::VerificationFailed {
        path: src.to_path_buf(),
        reason: e.to_string(),
    })?;
    if actual != digest {
        return Err(MoveError::VerificationFailed {
            path: src.to_path_buf(),
            reason: format!("digest {} does not match {}", actual.short_hex(), digest.short_hex()),
        });
    }
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}
