use super::common::{
    config, content, documents_under, name, total_bytes, write_file, write_in_order,
};
use chrono::Utc;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use wechat_dedup::actions::restore_manifest;
use wechat_dedup::error::ExitCode;
use wechat_dedup::manifest::{Manifest, MANIFEST_FILE_NAME};
use wechat_dedup::output::{RunMode, Stage, REPORT_FILE_NAME};
use wechat_dedup::pipeline::{run_pipeline, Pipeline};
use wechat_dedup::progress::ProgressCallback;

#[test]
fn test_scenario_keeps_oldest_copy() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(1, 5000);

    write_in_order(
        root.path(),
        &[
            ("b.pdf", &shared),
            ("a.pdf", &shared),
            ("c.pdf", &content(2, 7000)),
        ],
    );

    let report = run_pipeline(
        config(root.path(), quarantine.path()),
        RunMode::Apply,
        None,
    )
    .unwrap();

    assert_eq!(report.summary.duplicate_groups, 1);
    assert_eq!(report.summary.files_moved, 1);
    assert_eq!(report.summary.bytes_reclaimed, 5000);
    assert_eq!(report.exit_code(), ExitCode::Success);

    let group = &report.groups[0];
    assert_eq!(name(&group.keeper), "b.pdf");
    assert_eq!(name(&group.moved[0].from), "a.pdf");
    assert_eq!(name(&group.moved[0].to), "a.pdf");

    assert!(root.path().join("b.pdf").exists());
    assert!(root.path().join("c.pdf").exists());
    assert!(!root.path().join("a.pdf").exists());
    assert_eq!(fs::read(quarantine.path().join("a.pdf")).unwrap(), shared);

    let markdown = fs::read_to_string(quarantine.path().join(REPORT_FILE_NAME)).unwrap();
    assert!(markdown.contains("| Duplicate groups | 1 |"));
    assert!(markdown.contains("| Files moved | 1 |"));
    assert!(markdown.contains("(5000 bytes)"));
}

#[test]
fn test_same_size_different_content_is_not_a_group() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    write_file(root.path(), "x.pdf", &content(1, 4096));
    write_file(root.path(), "y.pdf", &content(9, 4096));

    let pipeline = Pipeline::new(config(root.path(), quarantine.path()));
    let detection = pipeline.detect().unwrap();

    assert!(detection.is_empty());
    assert_eq!(detection.summary.hashed_files, 2);
    assert_eq!(detection.summary.duplicate_groups, 0);
}

#[test]
fn test_distinct_sizes_are_never_hashed() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    for (i, n) in [100, 200, 300, 400].into_iter().enumerate() {
        write_file(root.path(), &format!("f{}.doc", i), &content(0, n));
    }

    let pipeline = Pipeline::new(config(root.path(), quarantine.path()));
    let detection = pipeline.detect().unwrap();

    assert_eq!(detection.summary.total_files, 4);
    assert_eq!(detection.summary.eliminated_by_size, 4);
    assert_eq!(detection.summary.hashed_files, 0);
}

/// Deletes a file the moment hashing starts.
struct DeleteOnHash {
    victim: std::path::PathBuf,
    fired: AtomicUsize,
}

impl ProgressCallback for DeleteOnHash {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        if phase == "hash" && self.fired.fetch_add(1, Ordering::SeqCst) == 0 {
            fs::remove_file(&self.victim).unwrap();
        }
    }
    fn on_progress(&self, _current: usize, _path: &str) {}
    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_file_vanishing_before_hashing_is_a_warning() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(3, 2048);
    let paths = write_in_order(
        root.path(),
        &[("one.pdf", &shared), ("two.pdf", &shared), ("three.pdf", &shared)],
    );

    let callback = Arc::new(DeleteOnHash {
        victim: paths[2].clone(),
        fired: AtomicUsize::new(0),
    });
    let pipeline =
        Pipeline::new(config(root.path(), quarantine.path())).with_progress_callback(callback);
    let detection = pipeline.detect().unwrap();
    let report = pipeline.apply(&detection, Utc::now()).unwrap();

    assert_eq!(report.summary.duplicate_groups, 1);
    assert_eq!(report.summary.files_moved, 1);
    assert_eq!(name(&report.groups[0].keeper), "one.pdf");
    assert!(report
        .warnings
        .iter()
        .any(|w| w.stage == Stage::Hash && w.message.contains("three.pdf")));
    assert_eq!(report.exit_code(), ExitCode::PartialSuccess);
}

#[test]
fn test_second_run_finds_nothing() {
    let root = tempdir().unwrap();
    let quarantine = root.path().join("WeChat-Duplicates");
    let shared = content(5, 3000);
    write_in_order(
        root.path(),
        &[("1.pdf", &shared), ("sub/2.pdf", &shared), ("sub/3.docx", &shared)],
    );

    let first = run_pipeline(config(root.path(), &quarantine), RunMode::Apply, None).unwrap();
    assert_eq!(first.summary.files_moved, 2);

    let second = run_pipeline(config(root.path(), &quarantine), RunMode::Apply, None).unwrap();
    assert_eq!(second.summary.duplicate_groups, 0);
    assert_eq!(second.summary.files_moved, 0);
    assert_eq!(second.exit_code(), ExitCode::NoDuplicates);

    // The quarantine lives under the root but is never scanned.
    assert_eq!(second.summary.files_scanned, 1);
}

#[test]
fn test_no_file_is_lost() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let a = content(1, 1000);
    let b = content(2, 1000);
    write_in_order(
        root.path(),
        &[
            ("x/a1.pdf", &a),
            ("y/a2.pdf", &a),
            ("z/a3.pdf", &a),
            ("x/b1.doc", &b),
            ("y/b2.doc", &b),
            ("solo.docx", &content(3, 10)),
        ],
    );

    let before = documents_under(root.path());
    let before_bytes = total_bytes(&before);

    let report = run_pipeline(
        config(root.path(), quarantine.path()),
        RunMode::Apply,
        None,
    )
    .unwrap();
    assert_eq!(report.summary.files_moved, 3);

    let after_roots = documents_under(root.path());
    let after_quarantine = documents_under(quarantine.path());
    assert_eq!(after_roots.len(), 3);
    assert_eq!(after_roots.len() + after_quarantine.len(), before.len());
    assert_eq!(
        total_bytes(&after_roots) + total_bytes(&after_quarantine),
        before_bytes
    );
}

#[test]
fn test_same_names_from_different_groups_do_not_collide() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    write_file(quarantine.path(), "report.pdf", b"already here");

    let x = content(7, 600);
    let y = content(8, 900);
    write_in_order(
        root.path(),
        &[
            ("keep/x.pdf", &x),
            ("keep/y.pdf", &y),
            ("chat1/report.pdf", &x),
            ("chat2/report.pdf", &y),
        ],
    );

    let report = run_pipeline(
        config(root.path(), quarantine.path()),
        RunMode::Apply,
        None,
    )
    .unwrap();
    assert_eq!(report.summary.files_moved, 2);

    let mut names: Vec<String> = report
        .groups
        .iter()
        .flat_map(|g| g.moved.iter().map(|m| name(&m.to).to_string()))
        .collect();
    names.sort();
    assert_eq!(names, vec!["report_1.pdf", "report_2.pdf"]);
    assert_eq!(
        fs::read(quarantine.path().join("report.pdf")).unwrap(),
        b"already here"
    );

    // Larger group first, so it claimed the first free suffix.
    assert_eq!(report.groups[0].size, 900);
    assert_eq!(name(&report.groups[0].moved[0].to), "report_1.pdf");
    assert_eq!(fs::read(quarantine.path().join("report_1.pdf")).unwrap(), y);
}

#[test]
fn test_manifest_accumulates_across_runs() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let first = content(1, 100);
    write_in_order(root.path(), &[("a.pdf", &first), ("b.pdf", &first)]);
    run_pipeline(config(root.path(), quarantine.path()), RunMode::Apply, None).unwrap();

    let second = content(2, 200);
    write_in_order(root.path(), &[("c.pdf", &second), ("d.pdf", &second)]);
    run_pipeline(config(root.path(), quarantine.path()), RunMode::Apply, None).unwrap();

    let manifest = Manifest::load_or_new(quarantine.path()).unwrap();
    let moved: Vec<&str> = manifest
        .entries
        .iter()
        .map(|e| name(&e.entry.original_path))
        .collect();
    assert_eq!(moved, vec!["b.pdf", "d.pdf"]);
    assert_eq!(manifest.total_bytes(), 300);
}

#[test]
fn test_dry_run_is_deterministic() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(4, 500);
    write_in_order(
        root.path(),
        &[("m.pdf", &shared), ("n.pdf", &shared), ("o.pdf", &shared)],
    );

    let seen = Mutex::new(Vec::new());
    for _ in 0..3 {
        let report = run_pipeline(
            config(root.path(), quarantine.path()),
            RunMode::DryRun,
            None,
        )
        .unwrap();
        seen.lock().unwrap().push((
            report.groups[0].keeper.clone(),
            report.groups[0].planned.clone(),
        ));
    }

    let seen = seen.into_inner().unwrap();
    assert!(seen.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(name(&seen[0].0), "m.pdf");
    assert!(documents_under(quarantine.path()).is_empty());
}

#[test]
fn test_duplicates_named_like_run_output_are_not_overwritten() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let notes = b"# meeting notes\n".to_vec();
    let settings = br#"{"theme":"dark"}"#.to_vec();
    let paths = write_in_order(
        root.path(),
        &[
            ("a/dedup-report.md", &notes),
            ("a/quarantine-manifest.json", &settings),
            ("b/dedup-report.md", &notes),
            ("b/quarantine-manifest.json", &settings),
        ],
    );

    let report = run_pipeline(
        config(root.path(), quarantine.path()).with_extensions(["md", "json"]),
        RunMode::Apply,
        None,
    )
    .unwrap();

    assert_eq!(report.summary.files_moved, 2);
    assert!(report.warnings.is_empty());
    let report_copy = quarantine.path().join("dedup-report_1.md");
    let manifest_copy = quarantine.path().join("quarantine-manifest_1.json");
    assert_eq!(fs::read(&report_copy).unwrap(), notes);
    assert_eq!(fs::read(&manifest_copy).unwrap(), settings);

    // The run's own files still sit under their fixed names.
    let markdown = fs::read_to_string(quarantine.path().join(REPORT_FILE_NAME)).unwrap();
    assert!(markdown.contains("| Files moved | 2 |"));
    let manifest = Manifest::load(&quarantine.path().join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(manifest.len(), 2);

    let (remaining, outcome) = restore_manifest(manifest, None);
    assert_eq!(outcome.restored.len(), 2);
    assert!(outcome.failed.is_empty());
    assert!(remaining.is_empty());
    assert_eq!(fs::read(&paths[2]).unwrap(), notes);
    assert_eq!(fs::read(&paths[3]).unwrap(), settings);
}
