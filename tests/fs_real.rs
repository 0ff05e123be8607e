// tests/fs_real.rs

mod common;
use crate::common::{read_file, write_file};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use assetdag::fs::{FileSystem, RealFileSystem};

type TestResult = Result<(), Box<dyn Error>>;

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_write_creates_parents_and_leaves_no_temp_files() -> TestResult {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join("dist/styles/main.css");

    RealFileSystem.write(&target, b"a {}")?;
    RealFileSystem.write(&target, b"b {}")?;

    assert_eq!(read_file(dir.path(), "dist/styles/main.css"), "b {}");
    assert_eq!(entries(&dir.path().join("dist/styles")), vec!["main.css"]);
    Ok(())
}

#[test]
fn test_failed_write_removes_its_temp_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    // A directory sits where the file should go, so the final rename fails.
    fs::create_dir_all(dir.path().join("dist/index.html/inner"))?;

    let result = RealFileSystem.write(&dir.path().join("dist/index.html"), b"<html></html>");

    assert!(result.is_err());
    assert_eq!(entries(&dir.path().join("dist")), vec!["index.html"]);
    Ok(())
}

#[test]
fn test_batch_failure_replaces_nothing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_file(root, "dist/a.css", "old a");
    // `dist/z` is a file, so nothing can be staged below it.
    write_file(root, "dist/z", "not a directory");

    let files: Vec<(PathBuf, &[u8])> = vec![
        (root.join("dist/a.css"), b"new a".as_slice()),
        (root.join("dist/z/b.css"), b"new b".as_slice()),
    ];
    let result = RealFileSystem.write_batch(&files);

    assert!(result.is_err());
    assert_eq!(read_file(root, "dist/a.css"), "old a");
    assert_eq!(entries(&root.join("dist")), vec!["a.css", "z"]);
    Ok(())
}

#[test]
fn test_batch_writes_every_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();

    let files: Vec<(PathBuf, &[u8])> = vec![
        (root.join("dist/a.css"), b"a".as_slice()),
        (root.join("dist/fonts/b.woff2"), b"b".as_slice()),
    ];
    RealFileSystem.write_batch(&files)?;

    assert_eq!(read_file(root, "dist/a.css"), "a");
    assert_eq!(read_file(root, "dist/fonts/b.woff2"), "b");
    assert_eq!(entries(&root.join("dist")), vec!["a.css", "fonts"]);
    Ok(())
}
