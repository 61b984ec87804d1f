//! Default locations of WeChat's file storage and of the quarantine.

use std::path::{Path, PathBuf};

use directories::{BaseDirs, UserDirs};

/// Bundle identifier of the sandboxed macOS client.
pub const MACOS_CONTAINER: &str = "com.tencent.xinWeChat";

/// Name of the default quarantine directory under the home directory.
pub const QUARANTINE_DIR_NAME: &str = "WeChat-Duplicates";

/// Storage roots of the desktop client on this platform.
///
/// The list may name directories that do not exist; the enumerator skips
/// those with a warning.
#[must_use]
pub fn default_roots() -> Vec<PathBuf> {
    match BaseDirs::new() {
        Some(base) => platform_roots(base.home_dir(), documents_dir().as_deref()),
        None => {
            log::warn!("Cannot determine the home directory; no default roots");
            Vec::new()
        }
    }
}

/// `~/WeChat-Duplicates`, or a relative `WeChat-Duplicates` without a home.
#[must_use]
pub fn default_quarantine_dir() -> PathBuf {
    BaseDirs::new()
        .map(|base| base.home_dir().join(QUARANTINE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(QUARANTINE_DIR_NAME))
}

fn documents_dir() -> Option<PathBuf> {
    UserDirs::new().and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
}

#[cfg(target_os = "macos")]
fn platform_roots(home: &Path, _documents: Option<&Path>) -> Vec<PathBuf> {
    let data = home
        .join("Library/Containers")
        .join(MACOS_CONTAINER)
        .join("Data");
    vec![
        data.join("Documents/xwechat_files"),
        data.join("Library/Application Support"),
    ]
}

#[cfg(not(target_os = "macos"))]
fn platform_roots(home: &Path, documents: Option<&Path>) -> Vec<PathBuf> {
    let documents = documents
        .map(Path::to_path_buf)
        .unwrap_or_else(|| home.join("Documents"));
    vec![documents.join("WeChat Files")]
}
