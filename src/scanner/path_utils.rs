//! Unicode path normalization and deterministic path ordering.
//!
//! macOS stores file names decomposed (NFD) while Windows and Linux
//! usually store them composed (NFC). The same visible name can therefore
//! have two byte spellings:
//!
//! - NFC: `café.pdf`, 'é' is U+00E9
//! - NFD: `café.pdf`, 'e' U+0065 followed by U+0301
//!
//! Ordering by the NFC form first keeps keeper selection identical across
//! platforms for the same tree.
//!
//! # Example
//!
//! ```
//! use wechat_dedup::scanner::path_utils::{normalize_path_str, compare_paths};
//! use std::cmp::Ordering;
//! use std::path::Path;
//!
//! assert_eq!(normalize_path_str("cafe\u{0301}.pdf"), "café.pdf");
//! assert_eq!(
//!     compare_paths(Path::new("/a/b.pdf"), Path::new("/a/c.pdf")),
//!     Ordering::Less
//! );
//! ```

use std::cmp::Ordering;
use std::path::Path;

use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// NFC form of a path, lossily converted to UTF-8.
#[must_use]
pub fn path_key(path: &Path) -> String {
    normalize_path_str(&path.to_string_lossy())
}

/// Total order on paths: NFC string first, raw path second.
///
/// The second key makes two spellings that normalize identically still
/// compare deterministically instead of as equal.
#[must_use]
pub fn compare_paths(a: &Path, b: &Path) -> Ordering {
    path_key(a).cmp(&path_key(b)).then_with(|| a.cmp(b))
}
