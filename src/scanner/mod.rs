//! Scanner module for candidate discovery and content hashing.
//!
//! This module provides functionality for:
//! - Walking the configured roots with jwalk
//! - Filtering candidates by extension and minimum size
//! - Streaming BLAKE3 digests of file contents
//! - Hardlink detection and Unicode path normalization
//!
//! # Architecture
//!
//! - [`enumerator`]: Root resolution and directory traversal
//! - [`hasher`]: Chunked content hashing
//! - [`hardlink`]: Inode tracking so one inode is only a candidate once
//! - [`path_utils`]: NFC normalization used for deterministic path ordering
//!
//! # Example
//!
//! ```no_run
//! use wechat_dedup::scanner::{Enumerator, EnumeratorConfig};
//! use std::path::PathBuf;
//!
//! let config = EnumeratorConfig::default().with_min_size(1024);
//! let enumerator = Enumerator::new(&[PathBuf::from("/data/docs")], config);
//! for entry in enumerator.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod enumerator;
pub mod hardlink;
pub mod hasher;
pub mod path_utils;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use enumerator::{resolve_roots, Enumerator};
pub use hasher::{Hasher, CHUNK_SIZE};

/// Extensions accepted when the configuration does not name any.
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// Fixed-width content digest (BLAKE3, 32 bytes).
///
/// Serialized as a 64-character lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Digest([u8; 32]);

impl Digest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hexadecimal representation (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hexadecimal string.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError`] if the string has the wrong length or
    /// contains a non-hex character.
    pub fn from_hex(hex: &str) -> Result<Self, DigestParseError> {
        if hex.len() != 64 {
            return Err(DigestParseError::Length(hex.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| DigestParseError::InvalidHex(pair.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// First twelve hex characters, for compact log lines.
    #[must_use]
    pub fn short_hex(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_hex()
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// Errors from parsing a hex digest.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestParseError {
    /// Wrong number of characters.
    #[error("digest must be 64 hex characters, got {0}")]
    Length(usize),

    /// A byte pair was not valid hexadecimal.
    #[error("invalid hex in digest: {0:?}")]
    InvalidHex(String),
}

/// A candidate file discovered by the enumerator.
///
/// Identity is the absolute path. The digest is filled in at most once,
/// by the hashing phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Birth time where the filesystem records one, modification time otherwise
    pub created: SystemTime,
    digest: Option<Digest>,
}

impl FileRecord {
    /// Create a record without a digest.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, created: SystemTime) -> Self {
        Self {
            path,
            size,
            created,
            digest: None,
        }
    }

    /// The content digest, once computed.
    #[must_use]
    pub fn digest(&self) -> Option<Digest> {
        self.digest
    }

    /// Record the content digest.
    ///
    /// Returns `false` and leaves the record untouched if a digest was
    /// already set.
    pub fn set_digest(&mut self, digest: Digest) -> bool {
        if self.digest.is_some() {
            debug_assert!(false, "digest set twice for {}", self.path.display());
            return false;
        }
        self.digest = Some(digest);
        true
    }

    /// Builder-style variant of [`set_digest`](Self::set_digest).
    #[must_use]
    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.set_digest(digest);
        self
    }

    /// Lowercase extension without the dot, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }
}

/// Lowercase extension of a path without the leading dot.
#[must_use]
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Normalize user-supplied extensions: trim, strip leading dots, lowercase.
///
/// Empty entries are dropped.
#[must_use]
pub fn normalize_extensions<I, S>(extensions: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Configuration for candidate enumeration.
#[derive(Debug, Clone, Default)]
pub struct EnumeratorConfig {
    /// Allowed extensions, lowercase without dot. Empty accepts every file.
    pub extensions: BTreeSet<String>,

    /// Minimum file size to include (in bytes).
    /// Zero-byte files are never candidates regardless of this value.
    pub min_size: u64,

    /// Gitignore-style patterns to exclude, matched relative to each root.
    pub exclude_patterns: Vec<String>,

    /// Directories never descended into (the quarantine directory).
    pub excluded_dirs: Vec<PathBuf>,
}

impl EnumeratorConfig {
    /// Set the extension allow-list.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = normalize_extensions(extensions);
        self
    }

    /// Set the minimum size.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the exclude patterns.
    #[must_use]
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Add a directory that must never be enumerated.
    #[must_use]
    pub fn with_excluded_dir(mut self, dir: PathBuf) -> Self {
        self.excluded_dirs.push(dir);
        self
    }

    /// Whether a path's extension is on the allow-list.
    #[must_use]
    pub fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        extension_of(path).is_some_and(|ext| self.extensions.contains(&ext))
    }
}

/// Errors that can occur during enumeration.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root lies in a directory that is never scanned, such as the
    /// quarantine directory.
    #[error("Root {root} is inside excluded directory {excluded}")]
    InsideExcludedDir {
        /// The rejected root
        root: PathBuf,
        /// The excluded directory containing it
        excluded: PathBuf,
    },

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
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
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::NotADirectory(p) => p,
            Self::InsideExcludedDir { root: path, .. } | Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file vanished before it could be read.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Hashing stopped because shutdown was requested.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
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
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Interrupted(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
