use clap::Parser;
use linkdupe::cli::Cli;
use linkdupe::error::ExitCode;
use linkdupe::run_app;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn cli(dir: &Path, extra: &[&str]) -> Cli {
    let mut args = vec![
        "linkdupe".to_string(),
        "--dir".to_string(),
        dir.display().to_string(),
        "--quiet".to_string(),
        "--no-progress".to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn test_app_links_duplicates() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x66; 20000];
    write(&dir.path().join("a.bin"), &content);
    write(&dir.path().join("b.bin"), &content);

    let code = run_app(cli(dir.path(), &[])).unwrap();

    assert_eq!(code, ExitCode::Success);
    #[cfg(unix)]
    {
        let links = ["a.bin", "b.bin"]
            .iter()
            .filter(|n| {
                fs::symlink_metadata(dir.path().join(n))
                    .unwrap()
                    .file_type()
                    .is_symlink()
            })
            .count();
        assert_eq!(links, 1);
    }
}

#[test]
fn test_app_no_duplicates() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.bin"), &vec![1u8; 20000]);
    write(&dir.path().join("b.bin"), &vec![2u8; 20000]);

    let code = run_app(cli(dir.path(), &[])).unwrap();

    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_app_dry_run_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x77; 20000];
    write(&dir.path().join("a.bin"), &content);
    write(&dir.path().join("b.bin"), &content);

    let code = run_app(cli(dir.path(), &["--dry-run"])).unwrap();

    assert_eq!(code, ExitCode::Success);
    for name in ["a.bin", "b.bin"] {
        let meta = fs::symlink_metadata(dir.path().join(name)).unwrap();
        assert!(meta.file_type().is_file());
    }
}

#[test]
fn test_app_min_size_flag() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.bin"), &[8u8; 2000]);
    write(&dir.path().join("b.bin"), &[8u8; 2000]);

    let code = run_app(cli(dir.path(), &["--dry-run"])).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);

    let code = run_app(cli(dir.path(), &["--dry-run", "--min-size", "1K"])).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_app_json_output() {
    let dir = TempDir::new().unwrap();
    let content = vec![0x88; 20000];
    write(&dir.path().join("a.bin"), &content);
    write(&dir.path().join("b.bin"), &content);

    let code = run_app(cli(dir.path(), &["--dry-run", "--output", "json"])).unwrap();

    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_app_missing_root_fails() {
    let dir = TempDir::new().unwrap();

    let err = run_app(cli(&dir.path().join("missing"), &[])).unwrap_err();

    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{err:#}").contains("Duplicate scan failed"));
}

#[test]
#[cfg(unix)]
fn test_app_partial_success_on_unreadable_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let content = vec![0x99; 20000];
    write(&dir.path().join("a.bin"), &content);
    write(&dir.path().join("b.bin"), &content);
    let secret = dir.path().join("c.bin");
    write(&secret, &content);
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&secret).is_ok() {
        // Running as root.
        return;
    }

    let code = run_app(cli(dir.path(), &["--dry-run"])).unwrap();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(code, ExitCode::PartialSuccess);
}
