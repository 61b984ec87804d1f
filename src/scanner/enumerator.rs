//! Candidate enumeration over the configured roots using jwalk.
//!
//! # Overview
//!
//! [`Enumerator`] resolves the configured roots once, then yields a
//! [`FileRecord`] for every regular file below them that passes the
//! extension and size filters. Each call to [`Enumerator::walk`] starts a
//! fresh traversal.
//!
//! # Skipped entries
//!
//! - Symbolic links and special files
//! - Zero-byte files and files below the minimum size
//! - Extra hardlinks to an inode already yielded
//! - Anything under an excluded directory (the quarantine directory)
//! - Paths matching the gitignore-style exclude patterns
//!
//! Unreachable roots, and roots inside an excluded directory, are collected
//! by [`resolve_roots`] and surfaced via [`Enumerator::unreachable_roots`]
//! instead of failing the walk.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::hardlink::HardlinkTracker;
use super::{EnumeratorConfig, FileRecord, ScanError};

/// Canonicalize roots, drop unusable ones and collapse nested ones.
///
/// `excluded` must already be canonical where the directories exist. A root
/// equal to or below one of them is rejected, since nothing under an
/// excluded directory is ever scanned.
///
/// Returns the surviving roots sorted, and one [`ScanError`] per root that
/// does not exist, is not a directory, cannot be listed or is excluded.
pub fn resolve_roots(paths: &[PathBuf], excluded: &[PathBuf]) -> (Vec<PathBuf>, Vec<ScanError>) {
    let mut roots = Vec::new();
    let mut errors = Vec::new();

    for path in paths {
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping root {}: {}", path.display(), e);
                errors.push(ScanError::from_io(path, e));
                continue;
            }
        };

        if !canonical.is_dir() {
            log::warn!("Skipping root {}: not a directory", path.display());
            errors.push(ScanError::NotADirectory(canonical));
            continue;
        }

        if let Err(e) = std::fs::read_dir(&canonical) {
            log::warn!("Skipping unreadable root {}: {}", canonical.display(), e);
            errors.push(ScanError::from_io(&canonical, e));
            continue;
        }

        if let Some(dir) = excluded.iter().find(|dir| canonical.starts_with(dir)) {
            log::warn!(
                "Skipping root {}: inside excluded directory {}",
                canonical.display(),
                dir.display()
            );
            errors.push(ScanError::InsideExcludedDir {
                root: canonical,
                excluded: dir.clone(),
            });
            continue;
        }

        roots.push(canonical);
    }

    roots.sort();
    roots.dedup();

    // After sorting, an ancestor always precedes its descendants.
    let mut collapsed: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        if let Some(parent) = collapsed.iter().find(|kept| root.starts_with(kept)) {
            log::debug!(
                "Root {} is inside {}, not walking it separately",
                root.display(),
                parent.display()
            );
            continue;
        }
        collapsed.push(root);
    }

    (collapsed, errors)
}

/// Restartable candidate enumerator.
#[derive(Debug)]
pub struct Enumerator {
    roots: Vec<PathBuf>,
    unreachable: Vec<ScanError>,
    config: EnumeratorConfig,
    excluded_dirs: Vec<PathBuf>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Enumerator {
    /// Resolve `roots` and prepare an enumerator over the reachable ones.
    #[must_use]
    pub fn new(roots: &[PathBuf], config: EnumeratorConfig) -> Self {
        // Excluded directories may not exist yet; canonicalize those that do
        // so prefix checks line up with the canonical roots.
        let excluded_dirs: Vec<PathBuf> = config
            .excluded_dirs
            .iter()
            .map(|d| d.canonicalize().unwrap_or_else(|_| d.clone()))
            .collect();
        let (roots, unreachable) = resolve_roots(roots, &excluded_dirs);

        Self {
            roots,
            unreachable,
            config,
            excluded_dirs,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Roots that will be walked, canonical and non-overlapping.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Errors for roots that could not be used.
    #[must_use]
    pub fn unreachable_roots(&self) -> &[ScanError] {
        &self.unreachable
    }

    /// Move the unreachable-root errors out, leaving none behind.
    pub fn take_unreachable_roots(&mut self) -> Vec<ScanError> {
        std::mem::take(&mut self.unreachable)
    }

    /// The enumeration filters.
    #[must_use]
    pub fn config(&self) -> &EnumeratorConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn build_gitignore(&self, root: &Path) -> Option<Gitignore> {
        if self.config.exclude_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(root);
        for pattern in &self.config.exclude_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid exclude pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build exclude patterns: {}", e);
                None
            }
        }
    }

    /// Walk every root, yielding candidates in sorted order.
    ///
    /// Errors on individual entries are yielded as [`ScanError`] values and
    /// do not stop iteration. Setting the shutdown flag ends the sequence.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        let mut hardlinks = HardlinkTracker::new();

        self.roots
            .iter()
            .flat_map(move |root| {
                self.walk_dir(root)
                    .into_iter()
                    .map(move |entry| (root, entry))
            })
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Enumerator: shutdown requested, stopping iteration");
                    return false;
                }
                true
            })
            .filter_map(move |(root, entry)| match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let file_type = entry.file_type();

                    if file_type.is_dir() {
                        return None;
                    }
                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }
                    if !self.config.accepts_extension(&path) {
                        log::trace!("Skipping by extension: {}", path.display());
                        return None;
                    }

                    match std::fs::symlink_metadata(&path) {
                        Ok(metadata) => self.process_file(path, &metadata, &mut hardlinks),
                        Err(e) => Some(Err(Self::handle_io_error(&path, e))),
                    }
                }
                Err(e) => {
                    let path = e.path().map_or_else(|| root.clone(), Path::to_path_buf);
                    log::warn!("Enumerator error for {}: {}", path.display(), e);
                    Some(Err(match e.into_io_error() {
                        Some(io) => ScanError::from_io(&path, io),
                        None => ScanError::Io {
                            path,
                            source: std::io::Error::other("directory loop"),
                        },
                    }))
                }
            })
    }

    fn walk_dir(&self, root: &Path) -> WalkDir {
        let gitignore = self.build_gitignore(root);
        let excluded = self.excluded_dirs.clone();
        let root_owned = root.to_path_buf();

        WalkDir::new(root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(move |_depth, _path, _state, children| {
                // Removing a directory here also prevents descending into it.
                children.retain(|child| match child {
                    Ok(entry) => {
                        let path = entry.path();
                        let is_dir = entry.file_type().is_dir();

                        if is_dir && excluded.iter().any(|d| path == *d) {
                            log::debug!("Skipping excluded directory: {}", path.display());
                            return false;
                        }
                        if let Some(gi) = &gitignore {
                            let relative = path.strip_prefix(&root_owned).unwrap_or(&path);
                            if gi.matched(relative, is_dir).is_ignore() {
                                log::trace!("Excluded by pattern: {}", path.display());
                                return false;
                            }
                        }
                        true
                    }
                    Err(_) => true,
                });

                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            })
    }

    fn process_file(
        &self,
        path: PathBuf,
        metadata: &Metadata,
        hardlinks: &mut HardlinkTracker,
    ) -> Option<Result<FileRecord, ScanError>> {
        if !metadata.is_file() {
            log::trace!("Skipping special file: {}", path.display());
            return None;
        }

        let size = metadata.len();
        if size == 0 {
            log::debug!("Skipping empty file: {}", path.display());
            return None;
        }
        if size < self.config.min_size {
            log::trace!("Skipping file below minimum size ({}): {}", size, path.display());
            return None;
        }

        if hardlinks.is_hardlink(metadata) {
            log::debug!("Skipping hardlink: {}", path.display());
            return None;
        }

        Some(Ok(FileRecord::new(path, size, creation_time(metadata))))
    }

    fn handle_io_error(path: &Path, error: std::io::Error) -> ScanError {
        match error.kind() {
            std::io::ErrorKind::NotFound => {
                log::debug!("File vanished during enumeration: {}", path.display());
            }
            _ => log::warn!("Cannot stat {}: {}", path.display(), error),
        }
        ScanError::from_io(path, error)
    }
}

/// Birth time when the filesystem records it, modification time otherwise.
#[must_use]
pub fn creation_time(metadata: &Metadata) -> SystemTime {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
