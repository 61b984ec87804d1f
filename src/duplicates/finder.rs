//! Detection pipeline: enumerate, group by size, hash, group by digest.
//!
//! # Overview
//!
//! [`DuplicateFinder`] drives the detection half of a run:
//!
//! 1. **Enumerate** candidates under every reachable root
//! 2. **Size grouping** drops every file whose size is unique
//! 3. **Hashing** digests the remaining files on a bounded rayon pool,
//!    one task per size group
//! 4. **Digest grouping** keeps digests shared by two or more files
//!
//! Grouping by digest starts only after the pool has joined. Per-file
//! failures are collected in the [`ScanSummary`]; only "no reachable root"
//! and shutdown abort detection.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::{find_duplicate_groups, group_by_size, DuplicateGroup, SizeGroup};
use crate::progress::ProgressCallback;
use crate::scanner::{Enumerator, EnumeratorConfig, HashError, Hasher, ScanError};

/// Default hashing parallelism. Kept low so spinning disks are not thrashed.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Configuration for the hashing phase.
#[derive(Clone)]
pub struct HashConfig {
    /// Worker threads in the hashing pool.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for HashConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl HashConfig {
    /// Set the pool size (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Statistics from the hashing phase.
#[derive(Debug, Default)]
pub struct HashStats {
    /// Records that entered hashing
    pub input_files: usize,
    /// Records digested successfully
    pub hashed_files: usize,
    /// Records excluded after a read failure
    pub failed_files: usize,
    /// Bytes read by successful digests
    pub bytes_hashed: u64,
    /// One error per failed record
    pub errors: Vec<HashError>,
    /// Whether shutdown cut the phase short
    pub interrupted: bool,
}

/// Digest every member of every size group.
///
/// Returns the groups with digests filled in. Records that could not be
/// read are removed from their group and reported in [`HashStats::errors`].
#[must_use]
pub fn hash_size_groups(
    groups: Vec<SizeGroup>,
    hasher: Arc<Hasher>,
    config: &HashConfig,
) -> (Vec<SizeGroup>, HashStats) {
    let input_files: usize = groups.iter().map(SizeGroup::len).sum();
    let mut stats = HashStats {
        input_files,
        ..Default::default()
    };

    if input_files == 0 {
        log::debug!("Hashing: no files to process");
        return (Vec::new(), stats);
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("hash", input_files);
    }
    log::info!(
        "Hashing {} files in {} size groups on {} threads",
        input_files,
        groups.len(),
        config.io_threads
    );

    let completed = AtomicUsize::new(0);
    let hash_group = |group: SizeGroup| -> (SizeGroup, Vec<HashError>) {
        let size = group.size;
        let mut hashed = Vec::with_capacity(group.files.len());
        let mut errors = Vec::new();

        for mut file in group.files {
            if config.is_shutdown_requested() {
                log::debug!("Hashing: shutdown requested, skipping remaining files");
                break;
            }

            let digest = match hasher.digest_file(&file.path) {
                Ok(digest) => Some(digest),
                Err(HashError::Interrupted(_)) => break,
                Err(e) => {
                    log::warn!("Failed to hash {}: {}", file.path.display(), e);
                    errors.push(e);
                    None
                }
            };

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref callback) = config.progress_callback {
                callback.on_progress(done, &file.path.to_string_lossy());
                callback.on_item_completed(size);
            }

            if let Some(digest) = digest {
                log::trace!("Hashed {}: {}", file.path.display(), digest.short_hex());
                file.set_digest(digest);
                hashed.push(file);
            }
        }

        (SizeGroup::with_files(size, hashed), errors)
    };

    let run = || -> Vec<(SizeGroup, Vec<HashError>)> {
        groups.into_par_iter().map(hash_group).collect()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.io_threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            log::warn!(
                "Failed to create hashing pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            run()
        }
    };

    let mut hashed_groups = Vec::with_capacity(results.len());
    for (group, errors) in results {
        stats.hashed_files += group.len();
        stats.bytes_hashed += group.size * group.len() as u64;
        stats.failed_files += errors.len();
        stats.errors.extend(errors);
        hashed_groups.push(group);
    }

    if config.is_shutdown_requested() {
        stats.interrupted = true;
        log::info!("Hashing interrupted by shutdown signal");
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("hash");
    }

    log::info!(
        "Hashing complete: {} hashed, {} failed, {} read",
        stats.hashed_files,
        stats.failed_files,
        ByteSize(stats.bytes_hashed)
    );

    (hashed_groups, stats)
}

/// Configuration for [`DuplicateFinder`].
#[derive(Clone, Default)]
pub struct FinderConfig {
    /// Root directories to scan.
    pub roots: Vec<PathBuf>,
    /// Candidate filters.
    pub enumerator: EnumeratorConfig,
    /// Hashing phase settings.
    pub hashing: HashConfig,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("roots", &self.roots)
            .field("enumerator", &self.enumerator)
            .field("hashing", &self.hashing)
            .finish()
    }
}

impl FinderConfig {
    /// Set the roots.
    #[must_use]
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    /// Set the candidate filters.
    #[must_use]
    pub fn with_enumerator_config(mut self, config: EnumeratorConfig) -> Self {
        self.enumerator = config;
        self
    }

    /// Set the hashing pool size.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.hashing = self.hashing.with_io_threads(threads);
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.hashing = self.hashing.with_shutdown_flag(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.hashing = self.hashing.with_progress_callback(callback);
        self
    }

    fn shutdown_flag(&self) -> Option<&Arc<AtomicBool>> {
        self.hashing.shutdown_flag.as_ref()
    }

    fn is_shutdown_requested(&self) -> bool {
        self.hashing.is_shutdown_requested()
    }
}

/// Summary of the detection half of a run.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Roots actually walked (canonical)
    pub roots: Vec<PathBuf>,
    /// Candidates enumerated
    pub total_files: usize,
    /// Total bytes across all candidates
    pub total_size: u64,
    /// Candidates dropped because their size was unique
    pub eliminated_by_size: usize,
    /// Records digested
    pub hashed_files: usize,
    /// Records excluded after a read failure
    pub hash_failures: usize,
    /// Confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Copies beyond one per group
    pub duplicate_files: usize,
    /// Bytes freed if every extra copy were relocated
    pub reclaimable_space: u64,
    /// Wall-clock time for detection
    pub scan_duration: Duration,
    /// Unreachable roots and per-entry enumeration failures
    pub scan_errors: Vec<ScanError>,
    /// Per-file hashing failures
    pub hash_errors: Vec<HashError>,
}

impl ScanSummary {
    /// Human-readable reclaimable space.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Human-readable total candidate size.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }

    /// Total warnings collected during detection.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.scan_errors.len() + self.hash_errors.len()
    }
}

/// Errors that abort detection.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// Every configured root was missing or unreadable.
    #[error("None of the {count} configured roots is reachable")]
    NoReachableRoots {
        /// Number of roots configured
        count: usize,
        /// Why each root was rejected
        errors: Vec<ScanError>,
    },

    /// Shutdown was requested before detection finished.
    #[error("Scan interrupted by user")]
    Interrupted,
}

/// Orchestrates duplicate detection.
///
/// # Example
///
/// ```no_run
/// use wechat_dedup::duplicates::{DuplicateFinder, FinderConfig};
/// use wechat_dedup::scanner::EnumeratorConfig;
/// use std::path::PathBuf;
///
/// let config = FinderConfig::default()
///     .with_roots(vec![PathBuf::from("/data/WeChat Files")])
///     .with_enumerator_config(EnumeratorConfig::default().with_extensions(["pdf"]))
///     .with_io_threads(4);
/// let finder = DuplicateFinder::new(config);
///
/// let (groups, summary) = finder.find_duplicates().unwrap();
/// println!("{} groups, {} reclaimable", groups.len(), summary.reclaimable_display());
/// ```
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Arc<Hasher>,
}

impl DuplicateFinder {
    /// Create a finder.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new();
        if let Some(flag) = config.shutdown_flag() {
            hasher = hasher.with_shutdown_flag(flag.clone());
        }
        Self {
            config,
            hasher: Arc::new(hasher),
        }
    }

    /// The hasher used for content digests.
    #[must_use]
    pub fn hasher(&self) -> &Arc<Hasher> {
        &self.hasher
    }

    /// Run enumeration, size grouping, hashing and digest grouping.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::NoReachableRoots`] if no root could be used
    /// and [`FinderError::Interrupted`] if shutdown was requested.
    pub fn find_duplicates(&self) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();

        let mut enumerator = Enumerator::new(&self.config.roots, self.config.enumerator.clone());
        if let Some(flag) = self.config.shutdown_flag() {
            enumerator = enumerator.with_shutdown_flag(flag.clone());
        }

        if enumerator.roots().is_empty() {
            return Err(FinderError::NoReachableRoots {
                count: self.config.roots.len(),
                errors: enumerator.take_unreachable_roots(),
            });
        }
        summary.roots = enumerator.roots().to_vec();

        for root in enumerator.roots() {
            log::info!("Scanning {}", root.display());
        }

        let callback = self.config.hashing.progress_callback.clone();
        if let Some(ref callback) = callback {
            callback.on_phase_start("enumerate", 0);
        }

        let mut files = Vec::new();
        for result in enumerator.walk() {
            match result {
                Ok(file) => {
                    if let Some(ref callback) = callback {
                        callback.on_progress(files.len() + 1, &file.path.to_string_lossy());
                    }
                    files.push(file);
                }
                Err(e) => summary.scan_errors.push(e),
            }
        }

        if let Some(ref callback) = callback {
            callback.on_phase_end("enumerate");
        }

        // Unreachable roots lead the warning list so they read first in the report.
        let mut root_errors = enumerator.take_unreachable_roots();
        root_errors.append(&mut summary.scan_errors);
        summary.scan_errors = root_errors;

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        summary.total_files = files.len();
        summary.total_size = files.iter().map(|f| f.size).sum();
        log::info!(
            "Found {} candidate files ({})",
            summary.total_files,
            summary.total_size_display()
        );

        let (size_groups, size_stats) = group_by_size(files);
        summary.eliminated_by_size = size_stats.eliminated_unique;

        if size_groups.is_empty() {
            log::info!("No potential duplicates found after size grouping");
            summary.scan_duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        let (hashed_groups, hash_stats) =
            hash_size_groups(size_groups, self.hasher.clone(), &self.config.hashing);
        summary.hashed_files = hash_stats.hashed_files;
        summary.hash_failures = hash_stats.failed_files;
        summary.hash_errors = hash_stats.errors;

        if hash_stats.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let mut duplicate_groups = find_duplicate_groups(hashed_groups);
        duplicate_groups.sort_by(|a, b| {
            b.reclaimable_bytes()
                .cmp(&a.reclaimable_bytes())
                .then_with(|| a.digest.cmp(&b.digest))
        });

        summary.duplicate_groups = duplicate_groups.len();
        summary.duplicate_files = duplicate_groups
            .iter()
            .map(DuplicateGroup::duplicate_count)
            .sum();
        summary.reclaimable_space = duplicate_groups
            .iter()
            .map(DuplicateGroup::reclaimable_bytes)
            .sum();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok((duplicate_groups, summary))
    }
}
