use linkdupe::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use linkdupe::scanner::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_missing_root_is_reported_and_others_scanned() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.bin"), &[1; 100]);
    write(&dir.path().join("b.bin"), &[1; 100]);

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().join("missing"), dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.summary.scan_errors.len(), 1);
    match &result.summary.scan_errors[0] {
        ScanError::NotFound(p) => assert!(p.ends_with("missing")),
        other => panic!("Expected NotFound, got: {other:?}"),
    }
}

#[test]
fn test_all_roots_invalid_is_fatal() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("file.bin"), &[1; 10]);

    let result = DuplicateFinder::with_defaults().find_duplicates(&[
        dir.path().join("file.bin"),
        PathBuf::from("/nonexistent/linkdupe/path"),
    ]);

    match result {
        Err(FinderError::NoValidRoots(paths)) => assert_eq!(paths.len(), 2),
        other => panic!("Expected NoValidRoots, got: {other:?}"),
    }
}

#[test]
#[cfg(unix)]
fn test_unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    write(&dir.path().join("open/a.bin"), &[2; 100]);
    write(&dir.path().join("open/b.bin"), &[2; 100]);
    write(&dir.path().join("locked/c.bin"), &[2; 100]);

    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let readable = fs::read_dir(&locked).is_ok();

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().to_path_buf()]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let result = result.unwrap();

    if readable {
        // Running as root: permissions are not enforced.
        assert_eq!(result.groups[0].len(), 3);
        return;
    }
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].len(), 2);
    assert!(result
        .summary
        .scan_errors
        .iter()
        .any(|e| matches!(e, ScanError::PermissionDenied(_))));
}

#[test]
#[cfg(unix)]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.bin"), &[3; 100]);
    write(&dir.path().join("b.bin"), &[3; 100]);
    let secret = dir.path().join("c.bin");
    write(&secret, &[3; 100]);
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();
    let readable = fs::File::open(&secret).is_ok();

    let result = DuplicateFinder::new(FinderConfig::default().with_min_size(0))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();

    if readable {
        assert_eq!(result.groups[0].len(), 3);
        return;
    }
    assert_eq!(result.groups[0].len(), 2);
    assert_eq!(result.summary.scan_errors.len(), 1);
    assert_eq!(result.summary.scan_errors[0].path(), secret.canonicalize().unwrap());
}
