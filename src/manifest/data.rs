//! Data structures for the restore manifest.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::quarantine::QuarantineEntry;

/// Current version of the manifest file format.
pub const MANIFEST_VERSION: u32 = 1;

/// File name of the manifest inside the quarantine directory.
pub const MANIFEST_FILE_NAME: &str = "quarantine-manifest.json";

/// Name the manifest is written under before it replaces [`MANIFEST_FILE_NAME`].
pub const MANIFEST_TMP_FILE_NAME: &str = "quarantine-manifest.json.tmp";

/// Every file currently held in one quarantine directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version.
    pub version: u32,
    /// Last time entries were added or removed.
    pub updated_at: DateTime<Utc>,
    /// The quarantine directory the entries live in.
    pub quarantine_dir: PathBuf,
    /// One entry per quarantined file, oldest first.
    pub entries: Vec<ManifestEntry>,
}

/// A quarantined file and when it was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// The relocation record.
    #[serde(flatten)]
    pub entry: QuarantineEntry,
    /// When the relocation happened.
    pub moved_at: DateTime<Utc>,
}

impl Manifest {
    /// Empty manifest for `quarantine_dir`.
    #[must_use]
    pub fn new(quarantine_dir: &Path) -> Self {
        Self {
            version: MANIFEST_VERSION,
            updated_at: Utc::now(),
            quarantine_dir: quarantine_dir.to_path_buf(),
            entries: Vec::new(),
        }
    }

    /// Location of the manifest file for `quarantine_dir`.
    #[must_use]
    pub fn path_in(quarantine_dir: &Path) -> PathBuf {
        quarantine_dir.join(MANIFEST_FILE_NAME)
    }

    /// Append relocations made at `moved_at`, keeping earlier entries.
    pub fn append<I>(&mut self, entries: I, moved_at: DateTime<Utc>)
    where
        I: IntoIterator<Item = QuarantineEntry>,
    {
        self.entries.extend(
            entries
                .into_iter()
                .map(|entry| ManifestEntry { entry, moved_at }),
        );
        self.updated_at = moved_at;
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held in quarantine according to the manifest.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.entry.size).sum()
    }
}
