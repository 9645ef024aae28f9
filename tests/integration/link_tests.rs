#![cfg(unix)]

use linkdupe::actions::{link_groups, LinkConfig};
use linkdupe::duplicates::{DuplicateFinder, FinderConfig};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).unwrap().file_type().is_symlink()
}

#[test]
fn test_scan_then_link_pair() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x42; 20000];
    let a = dir.path().join("a/x.bin");
    let b = dir.path().join("b/x.bin");
    write(&a, &content);
    write(&b, &content);

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    let report = link_groups(&result.groups, &result.link_targets, &LinkConfig::default());

    assert_eq!(report.linked, 1);
    assert_eq!(report.bytes_reclaimed, 20000);
    assert_eq!(report.bytes_reclaimed, result.summary.reclaimable_space);

    // Exactly one of the two is now a link to the other.
    assert!(is_symlink(&a) ^ is_symlink(&b));
    assert_eq!(fs::read(&a).unwrap(), content);
    assert_eq!(fs::read(&b).unwrap(), content);
}

#[test]
fn test_links_are_absolute() {
    let dir = TempDir::new().unwrap();
    let content = vec![1u8; 500];
    write(&dir.path().join("one/f.bin"), &content);
    write(&dir.path().join("two/f.bin"), &content);

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    link_groups(&result.groups, &result.link_targets, &LinkConfig::default());

    let group = &result.groups[0];
    let link = group.members.iter().find(|p| is_symlink(p)).unwrap();
    assert!(fs::read_link(link).unwrap().is_absolute());
}

#[test]
fn test_saved_bytes_match_report_for_three_copies() {
    let dir = TempDir::new().unwrap();
    let content = vec![7u8; 4096];
    for name in ["a", "b", "c"] {
        write(&dir.path().join(name).join("f.bin"), &content);
    }

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(1024))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    let report = link_groups(&result.groups, &result.link_targets, &LinkConfig::default());

    assert_eq!(result.groups[0].reclaimable_bytes(), 8192);
    assert_eq!(report.linked, 2);
    assert_eq!(report.bytes_reclaimed, 8192);
}

#[test]
fn test_mode_of_duplicate_applied_through_link() {
    let dir = TempDir::new().unwrap();
    let content = vec![3u8; 100];
    let keep = dir.path().join("a/keep.bin");
    let dup = dir.path().join("b/dup.bin");
    write(&keep, &content);
    write(&dup, &content);
    fs::set_permissions(&keep, fs::Permissions::from_mode(0o644)).unwrap();
    fs::set_permissions(&dup, fs::Permissions::from_mode(0o600)).unwrap();

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    let report = link_groups(&result.groups, &result.link_targets, &LinkConfig::default());
    assert_eq!(report.linked, 1);

    // Which member is kept depends on discovery order.
    let link = result.groups[0]
        .members
        .iter()
        .find(|p| is_symlink(p))
        .unwrap()
        .clone();
    let expected = if link.ends_with("b/dup.bin") { 0o600 } else { 0o644 };
    let mode = fs::metadata(&link).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, expected);
}

#[test]
fn test_verify_mode_links_unchanged_files() {
    let dir = TempDir::new().unwrap();
    let content = vec![8u8; 70_000];
    write(&dir.path().join("a.bin"), &content);
    write(&dir.path().join("b.bin"), &content);

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    let config = LinkConfig::default().with_verify_content(true);
    let report = link_groups(&result.groups, &result.link_targets, &config);

    assert_eq!(report.linked, 1);
    assert!(report.all_succeeded());
}

#[test]
fn test_read_only_directory_leaves_duplicate_intact() {
    let dir = TempDir::new().unwrap();
    let content = vec![5u8; 100];
    let keep = dir.path().join("a/keep.bin");
    let locked_dir = dir.path().join("b");
    let dup = locked_dir.join("dup.bin");
    write(&keep, &content);
    write(&dup, &content);

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o555)).unwrap();
    // Root ignores directory permissions; nothing to check then.
    let probe = locked_dir.join(".probe");
    if fs::write(&probe, b"x").is_ok() {
        fs::remove_file(&probe).unwrap();
        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let report = link_groups(&result.groups, &result.link_targets, &LinkConfig::default());
    fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755)).unwrap();

    if report.linked == 1 {
        // The locked directory held the canonical file; the other copy was linked.
        assert!(is_symlink(&keep));
        return;
    }
    assert_eq!(report.failure_count(), 1);
    assert!(!is_symlink(&dup));
    assert_eq!(fs::read(&dup).unwrap(), content);
    let leftovers = fs::read_dir(&locked_dir).unwrap().count();
    assert_eq!(leftovers, 1);
}
