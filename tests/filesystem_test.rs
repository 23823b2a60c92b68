//! Tests for the FileSystem boundary

use std::fs;

use tempfile::TempDir;

use mctrimmer::infrastructure::traits::{FileSystem, RealFileSystem};

// ============================================================
// write_atomic tests
// ============================================================

#[test]
fn given_existing_file_when_write_atomic_then_replaces_content() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("r.0.0.mca");
    fs::write(&path, b"old content that is longer").unwrap();

    // Act
    RealFileSystem.write_atomic(&path, b"new").unwrap();

    // Assert
    assert_eq!(fs::read(&path).unwrap(), b"new");
    let leftovers: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1, "no temp files left behind");
}

#[test]
fn given_missing_parent_when_write_atomic_then_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing").join("r.0.0.mca");

    let result = RealFileSystem.write_atomic(&path, b"data");

    assert!(result.is_err());
    assert!(!path.exists());
}

#[test]
fn given_nested_path_when_ensure_parent_then_creates_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a").join("b").join("r.0.0.mca");

    RealFileSystem.ensure_parent(&path).unwrap();
    RealFileSystem.write_atomic(&path, b"data").unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"data");
}

// ============================================================
// list_files tests
// ============================================================

#[test]
fn given_mixed_directory_when_list_files_then_returns_sorted_matches_only() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    for name in ["r.1.0.mca", "r.-1.0.mca", "r.0.0.mca", "r.0.0.mcr", "level.dat"] {
        fs::write(dir.join(name), b"").unwrap();
    }
    fs::create_dir_all(dir.join("sub")).unwrap();
    fs::write(dir.join("sub").join("r.5.5.mca"), b"").unwrap();

    // Act
    let files = RealFileSystem.list_files(dir, "mca").unwrap();

    // Assert
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["r.-1.0.mca", "r.0.0.mca", "r.1.0.mca"]);
}

#[test]
fn given_missing_directory_when_list_files_then_not_found() {
    let temp = TempDir::new().unwrap();
    let err = RealFileSystem
        .list_files(&temp.path().join("region"), "mca")
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn given_file_when_copy_then_destination_matches() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src.mca");
    let dst = temp.path().join("dst.mca");
    fs::write(&src, [1u8, 2, 3]).unwrap();

    let copied = RealFileSystem.copy(&src, &dst).unwrap();

    assert_eq!(copied, 3);
    assert_eq!(fs::read(&dst).unwrap(), vec![1, 2, 3]);
    assert!(src.exists());
}

// ============================================================
// absolute tests
// ============================================================

#[test]
fn given_missing_path_when_resolving_then_keeps_missing_tail() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();

    let resolved = RealFileSystem
        .absolute(&temp.path().join("a/./b/../c"))
        .unwrap();

    assert_eq!(resolved, base.join("a").join("c"));
}

#[cfg(unix)]
#[test]
fn given_symlinked_parent_of_missing_path_when_resolving_then_follows_link() {
    let temp = TempDir::new().unwrap();
    let real = temp.path().join("real");
    fs::create_dir(&real).unwrap();
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let via_link = RealFileSystem.absolute(&link.join("out")).unwrap();
    let direct = RealFileSystem.absolute(&real.join("out")).unwrap();

    assert_eq!(via_link, direct);
    assert!(!via_link.exists());
}
