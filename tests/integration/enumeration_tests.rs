use super::common::{config, content, name, write_file};
use std::fs;
use tempfile::tempdir;
use wechat_dedup::duplicates::{DuplicateFinder, FinderConfig};
use wechat_dedup::pipeline::{Pipeline, PipelineError};
use wechat_dedup::scanner::{Enumerator, EnumeratorConfig, DEFAULT_EXTENSIONS};

#[test]
fn test_duplicates_across_two_roots() {
    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    let body = content(1, 300);
    write_file(dir1.path(), "a.pdf", &body);
    write_file(dir2.path(), "b.pdf", &body);

    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_roots(vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()]),
    );
    let (groups, summary) = finder.find_duplicates().unwrap();

    assert_eq!(summary.roots.len(), 2);
    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 2);
}

#[test]
fn test_nested_roots_are_walked_once() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    let body = content(2, 300);
    write_file(dir.path(), "a.pdf", &body);
    write_file(&sub, "b.pdf", &body);

    let finder = DuplicateFinder::new(
        FinderConfig::default().with_roots(vec![sub.clone(), dir.path().to_path_buf(), sub]),
    );
    let (groups, summary) = finder.find_duplicates().unwrap();

    assert_eq!(summary.roots.len(), 1);
    assert_eq!(summary.total_files, 2);
    assert_eq!(groups[0].files.len(), 2);
}

#[test]
fn test_missing_root_is_a_warning_when_another_works() {
    let dir = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    write_file(dir.path(), "a.pdf", b"x");

    let mut cfg = config(dir.path(), quarantine.path());
    cfg.roots.push(dir.path().join("does-not-exist"));
    let detection = Pipeline::new(cfg).detect().unwrap();

    assert_eq!(detection.summary.total_files, 1);
    assert_eq!(detection.summary.scan_errors.len(), 1);
    assert!(detection.summary.scan_errors[0]
        .path()
        .ends_with("does-not-exist"));
}

#[test]
fn test_no_reachable_root_is_fatal() {
    let dir = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let file = write_file(dir.path(), "plain.pdf", b"x");

    let mut cfg = config(&dir.path().join("missing"), quarantine.path());
    cfg.roots.push(file);

    match Pipeline::new(cfg).detect() {
        Err(PipelineError::NoReachableRoots { count, errors }) => {
            assert_eq!(count, 2);
            assert_eq!(errors.len(), 2);
        }
        other => panic!("expected NoReachableRoots, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_filters_extension_size_and_empty_files() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "keep.PDF", &content(0, 50));
    write_file(dir.path(), "keep.docx", &content(0, 50));
    write_file(dir.path(), "small.doc", &content(0, 5));
    write_file(dir.path(), "empty.pdf", b"");
    write_file(dir.path(), "image.jpg", &content(0, 50));
    write_file(dir.path(), "noext", &content(0, 50));

    let enumerator = Enumerator::new(
        &[dir.path().to_path_buf()],
        EnumeratorConfig::default()
            .with_extensions(DEFAULT_EXTENSIONS)
            .with_min_size(10),
    );
    let mut names: Vec<String> = enumerator
        .walk()
        .map(|r| name(&r.unwrap().path).to_string())
        .collect();
    names.sort();

    assert_eq!(names, vec!["keep.PDF", "keep.docx"]);
}

#[test]
fn test_exclude_patterns_prune_subtrees() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "docs/a.pdf", b"same");
    write_file(dir.path(), "Backup/b.pdf", b"same");
    write_file(dir.path(), "docs/draft.tmp.pdf", b"same");

    let enumerator = Enumerator::new(
        &[dir.path().to_path_buf()],
        EnumeratorConfig::default()
            .with_exclude_patterns(vec!["Backup/".to_string(), "*.tmp.pdf".to_string()]),
    );
    let found: Vec<_> = enumerator.walk().map(|r| r.unwrap().path).collect();

    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("docs/a.pdf"));
}

#[test]
fn test_quarantine_inside_root_is_skipped() {
    let dir = tempdir().unwrap();
    let quarantine = dir.path().join("WeChat-Duplicates");
    write_file(dir.path(), "a.pdf", b"same");
    write_file(&quarantine, "a.pdf", b"same");

    let detection = Pipeline::new(config(dir.path(), &quarantine))
        .detect()
        .unwrap();

    assert_eq!(detection.summary.total_files, 1);
    assert!(detection.is_empty());
}

#[test]
fn test_walk_order_is_sorted_and_repeatable() {
    let dir = tempdir().unwrap();
    for n in ["c.pdf", "a/z.pdf", "b.pdf", "a/y.doc"] {
        write_file(dir.path(), n, b"1");
    }

    let enumerator = Enumerator::new(&[dir.path().to_path_buf()], EnumeratorConfig::default());
    let first: Vec<_> = enumerator.walk().map(|r| r.unwrap().path).collect();
    let second: Vec<_> = enumerator.walk().map(|r| r.unwrap().path).collect();

    assert_eq!(first, second);
    let names: Vec<&str> = first.iter().map(|p| name(p)).collect();
    assert_eq!(names, vec!["y.doc", "z.pdf", "b.pdf", "c.pdf"]);
}

#[cfg(unix)]
#[test]
fn test_symlinks_and_hardlinks_are_not_duplicates() {
    let dir = tempdir().unwrap();
    let original = write_file(dir.path(), "original.pdf", &content(6, 100));
    std::os::unix::fs::symlink(&original, dir.path().join("link.pdf")).unwrap();
    fs::hard_link(&original, dir.path().join("hard.pdf")).unwrap();

    let detection = Pipeline::new(config(dir.path(), &dir.path().join("q")))
        .detect()
        .unwrap();

    assert_eq!(detection.summary.total_files, 1);
    assert!(detection.is_empty());
}
