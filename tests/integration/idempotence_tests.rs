#![cfg(unix)]

use linkdupe::actions::{link_groups, LinkConfig};
use linkdupe::duplicates::{DuplicateFinder, FinderConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_min_size(0))
}

#[test]
fn test_second_run_finds_nothing_to_do() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x33; 2048];
    for name in ["a", "b", "c", "d"] {
        write(&dir.path().join(name).join("f.bin"), &content);
    }
    let roots = [dir.path().to_path_buf()];

    let first = finder().find_duplicates(&roots).unwrap();
    let report = link_groups(&first.groups, &first.link_targets, &LinkConfig::default());
    assert_eq!(report.linked, 3);

    let second = finder().find_duplicates(&roots).unwrap();
    assert!(second.groups.is_empty());
    assert_eq!(second.summary.symlinks_skipped, 3);
    assert_eq!(second.summary.files_scanned, 1);
}

#[test]
fn test_partial_prior_run_converges_on_existing_target() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x44; 2048];
    let target = dir.path().join("z/original.bin");
    write(&target, &content);
    write(&dir.path().join("a/copy.bin"), &content);
    write(&dir.path().join("b/copy.bin"), &content);
    // A link left behind by an earlier, interrupted pass.
    std::os::unix::fs::symlink(
        fs::canonicalize(&target).unwrap(),
        dir.path().join("c.bin"),
    )
    .unwrap();

    let result = finder().find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    let report = link_groups(&result.groups, &result.link_targets, &LinkConfig::default());
    assert_eq!(report.linked, 2);

    let canonical = fs::canonicalize(&target).unwrap();
    assert!(fs::symlink_metadata(&target).unwrap().file_type().is_file());
    for link in ["a/copy.bin", "b/copy.bin", "c.bin"] {
        let resolved: PathBuf = fs::read_link(dir.path().join(link)).unwrap();
        assert_eq!(resolved, canonical, "{link} should point at the original");
    }
}
