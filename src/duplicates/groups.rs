//! Size grouping and digest grouping.
//!
//! # Overview
//!
//! Files of different sizes cannot share content, so the first pass
//! partitions candidates by exact byte size and discards singletons
//! without touching their contents. After hashing, each surviving size
//! group is split by digest into confirmed [`DuplicateGroup`]s.
//!
//! # Example
//!
//! ```
//! use wechat_dedup::scanner::FileRecord;
//! use wechat_dedup::duplicates::group_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/a.pdf"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/b.pdf"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/c.pdf"), 2048, SystemTime::now()),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::scanner::{Digest, FileRecord};

/// Files sharing one exact size. Always holds two or more records once
/// produced by [`group_by_size`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeGroup {
    /// File size in bytes shared by every member
    pub size: u64,
    /// Members, in enumeration order
    pub files: Vec<FileRecord>,
}

impl SizeGroup {
    /// Create a size group from its members.
    #[must_use]
    pub fn with_files(size: u64, files: Vec<FileRecord>) -> Self {
        debug_assert!(files.iter().all(|f| f.size == size));
        Self { size, files }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A confirmed set of byte-identical files.
///
/// All members share `size` and `digest`. Consumed once by the retention
/// selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Content digest shared by every member
    pub digest: Digest,
    /// File size in bytes
    pub size: u64,
    /// Members, two or more
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Copies beyond the one that is kept.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Bytes freed if every extra copy is relocated.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }
}

/// Statistics from size grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Candidates that entered grouping
    pub total_files: usize,
    /// Total bytes across all candidates
    pub total_size: u64,
    /// Distinct sizes seen
    pub unique_sizes: usize,
    /// Size groups with two or more members
    pub potential_duplicate_groups: usize,
    /// Files in those groups
    pub potential_duplicates: usize,
    /// Files discarded because their size was unique
    pub eliminated_unique: usize,
}

impl GroupingStats {
    /// Percentage of candidates eliminated without hashing.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Partition candidates by size, dropping sizes seen only once.
///
/// Groups come back ordered by descending size so the largest potential
/// savings are hashed first. O(n), no I/O.
#[must_use]
pub fn group_by_size(files: Vec<FileRecord>) -> (Vec<SizeGroup>, GroupingStats) {
    let mut stats = GroupingStats {
        total_files: files.len(),
        total_size: files.iter().map(|f| f.size).sum(),
        ..Default::default()
    };

    let mut by_size: HashMap<u64, Vec<FileRecord>> = HashMap::new();
    for file in files {
        by_size.entry(file.size).or_default().push(file);
    }
    stats.unique_sizes = by_size.len();

    let mut groups: Vec<SizeGroup> = by_size
        .into_iter()
        .filter_map(|(size, files)| {
            if files.len() < 2 {
                stats.eliminated_unique += files.len();
                return None;
            }
            Some(SizeGroup::with_files(size, files))
        })
        .collect();
    groups.sort_by(|a, b| b.size.cmp(&a.size));

    stats.potential_duplicate_groups = groups.len();
    stats.potential_duplicates = groups.iter().map(SizeGroup::len).sum();

    log::info!(
        "Size grouping complete: {} files → {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (groups, stats)
}

/// Split a hashed size group into digest groups of two or more members.
///
/// Records without a digest (hash failures) are ignored, so a group that
/// shrank to one member after failures disappears here. Output is ordered
/// by digest.
#[must_use]
pub fn group_by_digest(group: SizeGroup) -> Vec<DuplicateGroup> {
    let size = group.size;
    let mut by_digest: BTreeMap<Digest, Vec<FileRecord>> = BTreeMap::new();

    for file in group.files {
        match file.digest() {
            Some(digest) => by_digest.entry(digest).or_default().push(file),
            None => log::trace!("Dropping unhashed record: {}", file.path.display()),
        }
    }

    by_digest
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(digest, files)| {
            log::debug!(
                "Duplicate group {}: {} files, {} bytes each",
                digest.short_hex(),
                files.len(),
                size
            );
            DuplicateGroup {
                digest,
                size,
                files,
            }
        })
        .collect()
}

/// Digest-group every hashed size group.
#[must_use]
pub fn find_duplicate_groups(hashed: Vec<SizeGroup>) -> Vec<DuplicateGroup> {
    hashed.into_iter().flat_map(group_by_digest).collect()
}
