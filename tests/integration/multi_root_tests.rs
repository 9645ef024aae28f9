use linkdupe::duplicates::{DuplicateFinder, FinderConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_min_size(0).with_threads(2))
}

#[test]
fn test_duplicates_across_roots_are_grouped() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let content = vec![0x55; 4000];
    write(&first.path().join("photo.jpg"), &content);
    write(&second.path().join("backup/photo.jpg"), &content);

    let result = finder()
        .find_duplicates(&[first.path().to_path_buf(), second.path().to_path_buf()])
        .unwrap();

    assert_eq!(result.summary.roots.len(), 2);
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].len(), 2);
}

#[test]
fn test_nested_root_does_not_group_file_with_itself() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("nested");
    write(&nested.join("only.bin"), &[1; 500]);

    let result = finder()
        .find_duplicates(&[dir.path().to_path_buf(), nested.clone()])
        .unwrap();

    assert!(result.groups.is_empty());
    assert_eq!(result.summary.roots.len(), 1);
    assert_eq!(result.summary.files_scanned, 1);
}

#[test]
fn test_repeated_root_is_scanned_once() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.bin"), &[2; 500]);
    write(&dir.path().join("b.bin"), &[2; 500]);

    let root = dir.path().to_path_buf();
    let result = finder()
        .find_duplicates(&[root.clone(), root.join("."), root])
        .unwrap();

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].len(), 2);
    assert_eq!(result.summary.files_scanned, 2);
}
