use super::common::{content, write_file, write_in_order};
use clap::Parser;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use wechat_dedup::cli::Cli;
use wechat_dedup::error::{exit_code_for, ExitCode};
use wechat_dedup::manifest::Manifest;
use wechat_dedup::output::REPORT_FILE_NAME;
use wechat_dedup::run_app;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["wechat-dedup", "-q"];
    argv.extend_from_slice(args);
    run_app(Cli::try_parse_from(argv).unwrap())
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_scan_reports_without_moving() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(1, 2000);
    let paths = write_in_order(root.path(), &[("a.pdf", &shared), ("b.pdf", &shared)]);

    let code = run(&["scan", s(root.path()), "--quarantine", s(quarantine.path())]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(paths.iter().all(|p| p.exists()));
    assert!(!quarantine.path().join(REPORT_FILE_NAME).exists());
}

#[test]
fn test_scan_without_duplicates_exits_two() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    write_file(root.path(), "a.pdf", &content(1, 2000));
    write_file(root.path(), "b.pdf", &content(2, 2000));

    let code = run(&["scan", s(root.path()), "--quarantine", s(quarantine.path())]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_scan_writes_preview_file() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let out = tempdir().unwrap();
    let preview = out.path().join("preview.md");
    let shared = content(2, 2000);
    write_in_order(root.path(), &[("a.doc", &shared), ("b.doc", &shared)]);

    run(&[
        "scan",
        s(root.path()),
        "--quarantine",
        s(quarantine.path()),
        "--output",
        "json",
        "--report",
        s(&preview),
    ])
    .unwrap();

    let text = fs::read_to_string(&preview).unwrap();
    assert!(text.contains("Mode**: dry run"));
    assert!(text.contains("b.doc"));
}

#[test]
fn test_extension_filter_from_command_line() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(3, 2000);
    write_in_order(root.path(), &[("a.pdf", &shared), ("b.pdf", &shared)]);

    let code = run(&[
        "scan",
        s(root.path()),
        "--quarantine",
        s(quarantine.path()),
        "--ext",
        "doc,docx",
    ])
    .unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_dedupe_then_restore() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let shared = content(4, 3000);
    let paths = write_in_order(
        root.path(),
        &[("old.pdf", &shared), ("new.pdf", &shared), ("newer.pdf", &shared)],
    );

    let code = run(&[
        "dedupe",
        "--yes",
        s(root.path()),
        "--quarantine",
        s(quarantine.path()),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(paths[0].exists());
    assert!(!paths[1].exists());
    assert!(!paths[2].exists());
    assert!(quarantine.path().join(REPORT_FILE_NAME).exists());

    let code = run(&["restore", "--quarantine", s(quarantine.path())]).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(paths.iter().all(|p| p.exists()));

    let manifest = Manifest::load_or_new(quarantine.path()).unwrap();
    assert!(manifest.is_empty());
}

#[test]
fn test_restore_without_manifest_is_a_no_op() {
    let quarantine = tempdir().unwrap();
    let code = run(&["restore", "--quarantine", s(quarantine.path())]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_unreachable_root_is_general_error() {
    let dir = tempdir().unwrap();
    let err = run(&[
        "scan",
        s(&dir.path().join("missing")),
        "--quarantine",
        s(dir.path()),
    ])
    .unwrap_err();

    assert_eq!(exit_code_for(&err), ExitCode::GeneralError);
    assert!(format!("{:#}", err).contains("No reachable root"));
}

#[test]
fn test_missing_config_file_is_error() {
    let dir = tempdir().unwrap();
    let err = run(&[
        "--config",
        s(&dir.path().join("absent.toml")),
        "scan",
        s(dir.path()),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_config_file_supplies_quarantine_and_extensions() {
    let root = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let cfg_dir = tempdir().unwrap();
    let shared = content(5, 2000);
    let paths = write_in_order(
        root.path(),
        &[
            ("a.txt", &shared),
            ("b.txt", &shared),
            ("c.pdf", &shared),
        ],
    );

    let cfg = cfg_dir.path().join("config.toml");
    fs::write(
        &cfg,
        format!(
            "extensions = [\"txt\"]\nquarantine_dir = {:?}\n",
            s(quarantine.path())
        ),
    )
    .unwrap();

    let code = run(&["--config", s(&cfg), "dedupe", "-y", s(root.path())]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(paths[0].exists());
    assert!(!paths[1].exists());
    assert!(paths[2].exists());
    assert!(quarantine.path().join("b.txt").exists());
}

#[test]
fn test_roots_command_succeeds() {
    assert_eq!(run(&["roots"]).unwrap(), ExitCode::Success);
}
