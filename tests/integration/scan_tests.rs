use linkdupe::duplicates::{DuplicateFinder, FinderConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_threads(4))
}

#[test]
fn test_identical_pair_above_threshold_is_grouped() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x5a; 20000];
    write(&dir.path().join("a/x.bin"), &content);
    write(&dir.path().join("b/x.bin"), &content);

    let result = finder().find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(group.size, 20000);
    assert_eq!(group.reclaimable_bytes(), 20000);

    let mut names: Vec<_> = group
        .members
        .iter()
        .map(|p| p.strip_prefix(fs::canonicalize(dir.path()).unwrap()).unwrap().to_path_buf())
        .collect();
    names.sort();
    assert_eq!(names, vec![Path::new("a/x.bin"), Path::new("b/x.bin")]);
}

#[test]
fn test_equal_size_different_content_not_grouped() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.bin"), &vec![1u8; 20000]);
    write(&dir.path().join("b.bin"), &vec![2u8; 20000]);

    let result = finder().find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(result.groups.is_empty());
    assert_eq!(result.summary.files_scanned, 2);
}

#[test]
fn test_files_below_default_threshold_ignored() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.bin"), &vec![3u8; 1000]);
    write(&dir.path().join("b.bin"), &vec![3u8; 1000]);

    let result = finder().find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(result.groups.is_empty());
    assert_eq!(result.summary.files_scanned, 0);
    assert_eq!(result.summary.small_files_skipped, 2);
}

#[test]
fn test_file_exactly_at_threshold_ignored() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.bin"), &vec![4u8; 16384]);
    write(&dir.path().join("b.bin"), &vec![4u8; 16384]);
    write(&dir.path().join("c.bin"), &vec![4u8; 16385]);
    write(&dir.path().join("d.bin"), &vec![4u8; 16385]);

    let result = finder().find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].size, 16385);
}

#[test]
fn test_large_group_and_deep_tree() {
    let dir = TempDir::new().unwrap();
    let content = vec![9u8; 300];
    let mut path = dir.path().to_path_buf();
    for depth in 0..12 {
        path = path.join(format!("level{depth}"));
        write(&path.join("copy.bin"), &content);
        write(&path.join(format!("unique{depth}.bin")), &vec![depth as u8; 300 + depth]);
    }

    let config = FinderConfig::default()
        .with_min_size(0)
        .with_threads(3)
        .with_channel_capacity(2);
    let result = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].len(), 12);
    assert_eq!(result.summary.reclaimable_space, 300 * 11);
    assert_eq!(result.summary.directories, 13);
}

#[test]
fn test_groups_sorted_by_savings() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("s1.bin"), &vec![1u8; 100]);
    write(&dir.path().join("s2.bin"), &vec![1u8; 100]);
    write(&dir.path().join("l1.bin"), &vec![2u8; 5000]);
    write(&dir.path().join("l2.bin"), &vec![2u8; 5000]);

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    let sizes: Vec<u64> = result.groups.iter().map(|g| g.size).collect();
    assert_eq!(sizes, vec![5000, 100]);
}

#[test]
#[cfg(unix)]
fn test_symlink_to_eligible_file_is_never_scanned() {
    let dir = TempDir::new().unwrap();
    let real = dir.path().join("real.bin");
    write(&real, &vec![6u8; 20000]);
    std::os::unix::fs::symlink(&real, dir.path().join("link.bin")).unwrap();

    let result = finder().find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(result.groups.is_empty());
    assert_eq!(result.summary.files_scanned, 1);
    assert_eq!(result.summary.symlinks_skipped, 1);
}

#[test]
#[cfg(unix)]
fn test_fifo_is_skipped() {
    let dir = TempDir::new().unwrap();
    let fifo = dir.path().join("pipe");
    let status = std::process::Command::new("mkfifo").arg(&fifo).status();
    if !matches!(status, Ok(s) if s.success()) {
        eprintln!("Skipping FIFO test: mkfifo unavailable");
        return;
    }
    write(&dir.path().join("a.bin"), &vec![1u8; 100]);

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(result.summary.files_scanned, 1);
}
