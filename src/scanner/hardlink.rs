//! Hardlink detection.
//!
//! Hardlinks are several directory entries pointing at one inode. They
//! share storage, so relocating one of them reclaims nothing and would
//! only break the other name. The enumerator keeps the first entry it
//! sees for an inode and drops the rest.
//!
//! On Unix the key is the (device, inode) pair. Other platforms do not
//! expose it through [`Metadata`], so every entry is treated as unique
//! and identical content is still caught by hashing.

use std::collections::HashSet;
use std::fs::Metadata;

/// Tracks seen inodes for one enumeration pass.
///
/// Not shared between threads; the enumerator owns one per `walk()`.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: HashSet<InodeKey>,
}

impl HardlinkTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this inode was already seen; records it otherwise.
    ///
    /// Always `false` on platforms without inode information.
    pub fn is_hardlink(&mut self, metadata: &Metadata) -> bool {
        match InodeKey::from_metadata(metadata) {
            Some(key) => !self.seen.insert(key),
            None => false,
        }
    }

    /// Number of distinct inodes recorded.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Whether inode tracking works on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InodeKey {
    dev: u64,
    ino: u64,
}

impl InodeKey {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}
