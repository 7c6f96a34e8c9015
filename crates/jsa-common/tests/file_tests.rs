//! Tests for whole-file input.

use jsa_common::{ReadFileError, read_file};
use std::fs;

#[test]
fn test_read_regular_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("temp.js");
    fs::write(&path, "hello\nworld!\n").expect("write temp file");

    let content = read_file(&path).expect("read temp file");
    assert_eq!(content, b"hello\nworld!\n");
}

#[test]
fn test_read_empty_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty.js");
    fs::write(&path, "").expect("write temp file");

    assert!(read_file(&path).expect("read temp file").is_empty());
}

#[test]
fn test_read_missing_file_reports_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("does-not-exist.js");

    let err = read_file(&path).expect_err("missing file should fail");
    assert!(
        matches!(err, ReadFileError::NotFound { .. }),
        "expected NotFound, got: {err:?}"
    );
    assert_eq!(err.path(), path.as_path());
    assert!(err.to_string().contains("does-not-exist.js"));
}

#[test]
fn test_read_directory_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");

    let err = read_file(dir.path()).expect_err("reading a directory should fail");
    assert!(
        matches!(err, ReadFileError::Io { .. }),
        "expected Io error, got: {err:?}"
    );
}
