//! Keeper selection for confirmed duplicate groups.
//!
//! The keeper is the member with the earliest creation time. Equal times
//! fall back to [`compare_paths`], so the same input always produces the
//! same keeper and the same order of removed files.

use std::cmp::Ordering;
use std::path::PathBuf;

use crate::scanner::path_utils::compare_paths;
use crate::scanner::{Digest, FileRecord};

use super::DuplicateGroup;

/// Outcome of keeper selection for one duplicate group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionDecision {
    /// Digest of the group
    pub digest: Digest,
    /// Size of every member in bytes
    pub size: u64,
    /// The copy left in place
    pub keeper: FileRecord,
    /// Copies to relocate, in retention order
    pub removed: Vec<FileRecord>,
}

impl RetentionDecision {
    /// Bytes freed if every removed copy is relocated.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size * self.removed.len() as u64
    }

    /// Paths of the removed copies.
    #[must_use]
    pub fn removed_paths(&self) -> Vec<PathBuf> {
        self.removed.iter().map(|r| r.path.clone()).collect()
    }
}

/// Total order used for retention: creation time, then path.
#[must_use]
pub fn retention_order(a: &FileRecord, b: &FileRecord) -> Ordering {
    a.created
        .cmp(&b.created)
        .then_with(|| compare_paths(&a.path, &b.path))
}

/// Pick the keeper of a duplicate group.
///
/// Returns `None` only for an empty group, which grouping never produces.
#[must_use]
pub fn select_keeper(group: DuplicateGroup) -> Option<RetentionDecision> {
    let DuplicateGroup {
        digest,
        size,
        mut files,
    } = group;

    files.sort_by(retention_order);
    let mut members = files.into_iter();
    let keeper = members.next()?;
    let removed: Vec<FileRecord> = members.collect();

    log::debug!(
        "Group {}: keeping {}, {} to quarantine",
        digest.short_hex(),
        keeper.path.display(),
        removed.len()
    );

    Some(RetentionDecision {
        digest,
        size,
        keeper,
        removed,
    })
}

/// Select keepers for every group.
#[must_use]
pub fn select_keepers(groups: Vec<DuplicateGroup>) -> Vec<RetentionDecision> {
    groups.into_iter().filter_map(select_keeper).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn at(path: &str, secs: u64) -> FileRecord {
        FileRecord::new(
            PathBuf::from(path),
            5000,
            SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        )
        .with_digest(Digest::from_bytes([4; 32]))
    }

    fn group(files: Vec<FileRecord>) -> DuplicateGroup {
        DuplicateGroup {
            digest: Digest::from_bytes([4; 32]),
            size: 5000,
            files,
        }
    }

    #[test]
    fn test_earliest_creation_time_wins() {
        let decision =
            select_keeper(group(vec![at("/r/a.pdf", 200), at("/r/b.pdf", 100)])).unwrap();

        assert_eq!(decision.keeper.path, PathBuf::from("/r/b.pdf"));
        assert_eq!(decision.removed_paths(), vec![PathBuf::from("/r/a.pdf")]);
        assert_eq!(decision.reclaimable_bytes(), 5000);
    }

    #[test]
    fn test_tie_broken_by_path() {
        let decision = select_keeper(group(vec![
            at("/r/zeta.pdf", 100),
            at("/r/alpha.pdf", 100),
            at("/r/mid.pdf", 100),
        ]))
        .unwrap();

        assert_eq!(decision.keeper.path, PathBuf::from("/r/alpha.pdf"));
        assert_eq!(
            decision.removed_paths(),
            vec![PathBuf::from("/r/mid.pdf"), PathBuf::from("/r/zeta.pdf")]
        );
    }

    #[test]
    fn test_removed_follow_retention_order() {
        let decision = select_keeper(group(vec![
            at("/r/c.pdf", 300),
            at("/r/a.pdf", 100),
            at("/r/d.pdf", 200),
            at("/r/b.pdf", 200),
        ]))
        .unwrap();

        assert_eq!(decision.keeper.path, PathBuf::from("/r/a.pdf"));
        assert_eq!(
            decision.removed_paths(),
            vec![
                PathBuf::from("/r/b.pdf"),
                PathBuf::from("/r/d.pdf"),
                PathBuf::from("/r/c.pdf"),
            ]
        );
    }

    #[test]
    fn test_selection_independent_of_input_order() {
        let files = vec![at("/r/b.pdf", 5), at("/r/a.pdf", 5), at("/r/c.pdf", 1)];
        let mut reversed = files.clone();
        reversed.reverse();

        assert_eq!(select_keeper(group(files)), select_keeper(group(reversed)));
    }

    #[test]
    fn test_keeper_and_removed_partition_group() {
        let files = vec![at("/r/a.pdf", 3), at("/r/b.pdf", 2), at("/r/c.pdf", 1)];
        let decision = select_keeper(group(files.clone())).unwrap();

        assert_eq!(decision.removed.len() + 1, files.len());
        assert!(!decision.removed.contains(&decision.keeper));
        for file in &files {
            assert!(decision.keeper == *file || decision.removed.contains(file));
        }
    }

    #[test]
    fn test_empty_group_has_no_decision() {
        assert!(select_keeper(group(Vec::new())).is_none());
    }

    #[test]
    fn test_select_keepers_maps_each_group() {
        let decisions = select_keepers(vec![
            group(vec![at("/r/a.pdf", 1), at("/r/b.pdf", 2)]),
            group(vec![at("/r/c.pdf", 2), at("/r/d.pdf", 1)]),
        ]);
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[1].keeper.path, PathBuf::from("/r/d.pdf"));
    }
}
