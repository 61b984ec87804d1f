//! Moving quarantined files back to where they were found.
//!
//! An entry is restored only when its original path is free and the
//! quarantined file still has the recorded size and digest. Entries that
//! cannot be restored stay in the manifest so a later attempt can retry.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::quarantine::{check_unchanged, relocate, reserve_exact, MoveError, QuarantineEntry};
use crate::manifest::{Manifest, ManifestEntry};
use crate::scanner::Hasher;

/// Outcome of a restore pass.
#[derive(Debug, Default)]
pub struct RestoreOutcome {
    /// Entries moved back to their original paths.
    pub restored: Vec<QuarantineEntry>,
    /// Entries left in quarantine, with the reason.
    pub failed: Vec<(QuarantineEntry, MoveError)>,
    /// Whether shutdown stopped the pass early.
    pub interrupted: bool,
}

impl RestoreOutcome {
    /// Bytes returned to their original locations.
    #[must_use]
    pub fn bytes_restored(&self) -> u64 {
        self.restored.iter().map(|e| e.size).sum()
    }

    /// Human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("Restored {} file(s)", self.restored.len())
        } else {
            format!(
                "Restored {} file(s), {} left in quarantine",
                self.restored.len(),
                self.failed.len()
            )
        }
    }
}

/// Move one quarantined file back to its original path.
///
/// # Errors
///
/// Returns [`MoveError::Occupied`] if something already exists at the
/// original path, [`MoveError::VerificationFailed`] if the quarantined
/// file no longer matches, or an I/O error from the move.
pub fn restore_entry(entry: &QuarantineEntry, hasher: &Hasher) -> Result<(), MoveError> {
    check_unchanged(&entry.quarantined_path, entry.size)?;

    let actual = hasher
        .digest_file(&entry.quarantined_path)
        .map_err(|e| MoveError::VerificationFailed {
            path: entry.quarantined_path.clone(),
            reason: e.to_string(),
        })?;
    if actual != entry.digest {
        return Err(MoveError::VerificationFailed {
            path: entry.quarantined_path.clone(),
            reason: "content changed while in quarantine".to_string(),
        });
    }

    if let Some(parent) = entry.original_path.parent() {
        fs::create_dir_all(parent).map_err(|e| MoveError::from_io(parent, e))?;
    }
    reserve_exact(&entry.original_path).map_err(|e| MoveError::from_io(&entry.original_path, e))?;

    relocate(
        &entry.quarantined_path,
        &entry.original_path,
        entry.size,
        entry.digest,
        hasher,
    )
}

/// Restore every manifest entry, returning the manifest of what remains.
///
/// Entries are tried newest first so a file quarantined twice under the
/// same original path comes back as the most recent copy.
pub fn restore_manifest(
    manifest: Manifest,
    shutdown_flag: Option<&Arc<AtomicBool>>,
) -> (Manifest, RestoreOutcome) {
    let hasher = Hasher::new();
    let mut outcome = RestoreOutcome::default();
    let mut remaining: Vec<ManifestEntry> = Vec::new();

    let Manifest {
        version,
        quarantine_dir,
        entries,
        ..
    } = manifest;

    let mut pending = entries.into_iter().rev();
    for item in pending.by_ref() {
        if shutdown_flag.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::info!("Shutdown requested, stopping restore");
            outcome.interrupted = true;
            remaining.push(item);
            break;
        }

        match restore_entry(&item.entry, &hasher) {
            Ok(()) => {
                log::debug!(
                    "Restored {} -> {}",
                    item.entry.quarantined_path.display(),
                    item.entry.original_path.display()
                );
                outcome.restored.push(item.entry);
            }
            Err(e) => {
                log::warn!(
                    "Could not restore {}: {}",
                    item.entry.original_path.display(),
                    e
                );
                outcome.failed.push((item.entry.clone(), e));
                remaining.push(item);
            }
        }
    }
    remaining.extend(pending);
    remaining.reverse();

    log::info!("{}", outcome.summary());

    let manifest = Manifest {
        version,
        updated_at: Utc::now(),
        quarantine_dir,
        entries: remaining,
    };
    (manifest, outcome)
}
