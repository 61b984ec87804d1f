//! Fixture helpers shared by the integration tests.

use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use wechat_dedup::pipeline::PipelineConfig;

/// Write `body` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, body).unwrap();
    path
}

/// Write files in the given order so that each one is strictly older than
/// the next, by birth time where the filesystem records one and by mtime.
pub fn write_in_order(dir: &Path, files: &[(&str, &[u8])]) -> Vec<PathBuf> {
    let base = 1_600_000_000;
    files
        .iter()
        .enumerate()
        .map(|(i, (name, body))| {
            let path = write_file(dir, name, body);
            let time = FileTime::from_unix_time(base + i as i64 * 60, 0);
            filetime::set_file_mtime(&path, time).unwrap();
            thread::sleep(Duration::from_millis(20));
            path
        })
        .collect()
}

/// `n` bytes of content derived from `seed`.
pub fn content(seed: u8, n: usize) -> Vec<u8> {
    (0..n).map(|i| seed.wrapping_add((i % 251) as u8)).collect()
}

/// Pipeline settings for one root and quarantine, two hashing threads.
pub fn config(root: &Path, quarantine: &Path) -> PipelineConfig {
    PipelineConfig::new(vec![root.to_path_buf()], quarantine.to_path_buf()).with_io_threads(2)
}

/// Regular files below `dir` with one of the default extensions.
pub fn documents_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return found;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            found.extend(documents_under(&path));
        } else if matches!(
            path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
            Some("pdf" | "doc" | "docx")
        ) {
            found.push(path);
        }
    }
    found.sort();
    found
}

/// Total size of `paths`.
pub fn total_bytes(paths: &[PathBuf]) -> u64 {
    paths.iter().map(|p| fs::metadata(p).unwrap().len()).sum()
}

/// File name as a `&str`.
pub fn name(path: &Path) -> &str {
    path.file_name().unwrap().to_str().unwrap()
}
