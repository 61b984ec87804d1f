use super::common::{config, content, write_file, write_in_order};
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;
use wechat_dedup::actions::restore_manifest;
use wechat_dedup::manifest::Manifest;
use wechat_dedup::output::RunMode;
use wechat_dedup::pipeline::run_pipeline;

#[test]
fn test_dedupe_then_restore_puts_everything_back() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(1, 1200);
    let paths = write_in_order(
        root.path(),
        &[
            ("keep.pdf", &shared),
            ("chat/copy.pdf", &shared),
            ("chat/copy (1).pdf", &shared),
        ],
    );

    let report = run_pipeline(
        config(root.path(), quarantine.path()),
        RunMode::Apply,
        None,
    )
    .unwrap();
    assert_eq!(report.summary.files_moved, 2);
    assert!(!paths[1].exists());
    assert!(!paths[2].exists());

    let manifest_path = Manifest::path_in(quarantine.path());
    let manifest = Manifest::load(&manifest_path).unwrap();
    assert_eq!(manifest.len(), 2);

    let (remaining, outcome) = restore_manifest(manifest, None);
    assert_eq!(outcome.restored.len(), 2);
    assert!(outcome.failed.is_empty());
    assert_eq!(outcome.bytes_restored(), 2400);
    assert!(remaining.is_empty());

    for path in &paths {
        assert_eq!(fs::read(path).unwrap(), shared);
    }
}

#[test]
fn test_restore_skips_occupied_original_path() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(2, 800);
    let paths = write_in_order(root.path(), &[("a.doc", &shared), ("b.doc", &shared)]);

    run_pipeline(
        config(root.path(), quarantine.path()),
        RunMode::Apply,
        None,
    )
    .unwrap();
    write_file(root.path(), "b.doc", b"new file with the same name");

    let manifest = Manifest::load_or_new(quarantine.path()).unwrap();
    let (remaining, outcome) = restore_manifest(manifest, None);

    assert!(outcome.restored.is_empty());
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        fs::read(&paths[1]).unwrap(),
        b"new file with the same name"
    );
    assert!(remaining.entries[0].entry.quarantined_path.exists());
}

#[test]
fn test_restore_refuses_changed_quarantined_file() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(3, 500);
    let paths = write_in_order(root.path(), &[("a.pdf", &shared), ("b.pdf", &shared)]);

    let report = run_pipeline(
        config(root.path(), quarantine.path()),
        RunMode::Apply,
        None,
    )
    .unwrap();
    let moved_to = &report.groups[0].moved[0].to;
    let mut tampered = shared.clone();
    tampered[0] ^= 0xff;
    fs::write(moved_to, &tampered).unwrap();

    let manifest = Manifest::load_or_new(quarantine.path()).unwrap();
    let (remaining, outcome) = restore_manifest(manifest, None);

    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(remaining.len(), 1);
    assert!(!paths[1].exists());
}

#[test]
fn test_restore_stops_when_interrupted() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(4, 300);
    write_in_order(
        root.path(),
        &[("a.pdf", &shared), ("b.pdf", &shared), ("c.pdf", &shared)],
    );
    run_pipeline(
        config(root.path(), quarantine.path()),
        RunMode::Apply,
        None,
    )
    .unwrap();

    let flag = Arc::new(AtomicBool::new(true));
    let manifest = Manifest::load_or_new(quarantine.path()).unwrap();
    let (remaining, outcome) = restore_manifest(manifest, Some(&flag));

    assert!(outcome.interrupted);
    assert!(outcome.restored.is_empty());
    assert_eq!(remaining.len(), 2);
}

#[test]
fn test_corrupted_manifest_is_rejected() {
    let quarantine = tempdir().unwrap();
    let path = Manifest::path_in(quarantine.path());
    let mut manifest = Manifest::new(quarantine.path());
    manifest.append(Vec::new(), chrono::Utc::now());
    manifest.save(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("\"version\": 1", "\"version\": 2")).unwrap();

    let err = Manifest::load(&path).unwrap_err();
    assert!(err.to_string().contains("checksum"));
}
