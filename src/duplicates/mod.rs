//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based candidate grouping
//! - Parallel content hashing of same-size candidates
//! - Digest grouping into confirmed duplicate sets
//! - Deterministic keeper selection

pub mod finder;
pub mod groups;
pub mod retention;

pub use finder::{
    hash_size_groups, DuplicateFinder, FinderConfig, FinderError, HashConfig, HashStats,
    ScanSummary, DEFAULT_IO_THREADS,
};
pub use groups::{
    find_duplicate_groups, group_by_digest, group_by_size, DuplicateGroup, GroupingStats,
    SizeGroup,
};
pub use retention::{retention_order, select_keeper, select_keepers, RetentionDecision};
