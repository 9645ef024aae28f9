use linkdupe::actions::{link_groups, LinkConfig};
use linkdupe::duplicates::DuplicateFinder;
use linkdupe::output::text::write_report;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_dry_run_reports_but_leaves_files() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x11; 20000];
    let a = dir.path().join("a/x.bin");
    let b = dir.path().join("b/x.bin");
    write(&a, &content);
    write(&b, &content);

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    let mut out = Vec::new();
    write_report(&mut out, &result.groups).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("Symlink "));
    assert!(text.trim_end().ends_with(", save bytes 20000"));
    assert_eq!(text.lines().count(), 1);

    let config = LinkConfig::default().with_dry_run(true);
    let report = link_groups(&result.groups, &result.link_targets, &config);

    assert_eq!(report.planned, 1);
    assert_eq!(report.linked, 0);
    for path in [&a, &b] {
        let meta = fs::symlink_metadata(path).unwrap();
        assert!(meta.file_type().is_file());
        assert_eq!(fs::read(path).unwrap(), content);
    }
}

#[test]
fn test_dry_run_creates_no_temporary_files() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x22; 20000];
    write(&dir.path().join("a.bin"), &content);
    write(&dir.path().join("b.bin"), &content);
    write(&dir.path().join("c.bin"), &content);

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    let config = LinkConfig::default()
        .with_dry_run(true)
        .with_verify_content(true);
    let report = link_groups(&result.groups, &result.link_targets, &config);

    assert_eq!(report.planned, 2);
    let entries = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 3);
}
