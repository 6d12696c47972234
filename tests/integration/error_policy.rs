//! Integration tests for the collect and fail-fast error policies

#![cfg(unix)]

use crate::integration::{fixture, permissions_are_enforced};
use dmerk::tree::builder::{ErrorPolicy, TreeBuilder};
use dmerk::{BuildError, EntryErrorKind};
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use tempfile::TempDir;

#[test]
fn test_broken_symlink_collected() {
    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("ok.txt", "fine")]);
    let clean = TreeBuilder::new(&root).build().unwrap();
    symlink(root.join("nowhere"), root.join("dead")).unwrap();

    let tree = TreeBuilder::new(&root)
        .with_policy(ErrorPolicy::Collect)
        .build()
        .unwrap();

    let dead = tree.root.child("dead").unwrap();
    assert_eq!(dead.error_detail().unwrap().kind, EntryErrorKind::BrokenSymlink);
    assert!(dead.digest().is_none());
    // Error nodes do not take part in the parent digest.
    assert_eq!(tree.root_digest(), clean.root_digest());
    assert_eq!(tree.errors().len(), 1);
    assert_eq!(tree.errors()[0].0, std::path::PathBuf::from("dead"));
}

#[test]
fn test_broken_symlink_aborts_fail_fast() {
    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("ok.txt", "fine")]);
    symlink(root.join("nowhere"), root.join("dead")).unwrap();

    let err = TreeBuilder::new(&root)
        .with_policy(ErrorPolicy::FailFast)
        .build()
        .unwrap_err();
    match err {
        BuildError::Aborted { path, error } => {
            assert!(path.ends_with("dead"));
            assert_eq!(error.kind, EntryErrorKind::BrokenSymlink);
        }
        other => panic!("expected abort, got {:?}", other),
    }
}

#[test]
fn test_socket_is_unsupported() {
    use std::os::unix::net::UnixListener;

    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("ok.txt", "fine")]);
    let _listener = UnixListener::bind(root.join("sock")).unwrap();

    let tree = TreeBuilder::new(&root).build().unwrap();
    assert_eq!(
        tree.root.child("sock").unwrap().error_detail().unwrap().kind,
        EntryErrorKind::UnsupportedSpecialFile
    );
}

#[test]
fn test_symlink_to_socket_is_unsupported() {
    use std::os::unix::net::UnixListener;

    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("ok.txt", "fine")]);
    let sock = temp_dir.path().join("outside.sock");
    let _listener = UnixListener::bind(&sock).unwrap();
    symlink(&sock, root.join("link")).unwrap();

    let tree = TreeBuilder::new(&root)
        .with_policy(ErrorPolicy::Collect)
        .build()
        .unwrap();
    let link = tree.root.child("link").unwrap();
    assert_eq!(
        link.error_detail().unwrap().kind,
        EntryErrorKind::UnsupportedSpecialFile
    );
    assert_eq!(tree.errors().len(), 1);

    let err = TreeBuilder::new(&root)
        .with_policy(ErrorPolicy::FailFast)
        .build()
        .unwrap_err();
    match err {
        BuildError::Aborted { path, error } => {
            assert!(path.ends_with("link"));
            assert_eq!(error.kind, EntryErrorKind::UnsupportedSpecialFile);
        }
        other => panic!("expected abort, got {:?}", other),
    }
}

#[test]
fn test_unreadable_file_and_directory_collected() {
    let temp_dir = TempDir::new().unwrap();
    if !permissions_are_enforced(&temp_dir) {
        eprintln!("skipping: permissions are not enforced for this user");
        return;
    }
    let root = fixture(
        &temp_dir,
        "data",
        &[("secret.txt", "hidden"), ("locked/inner.txt", "x"), ("open.txt", "o")],
    );
    fs::set_permissions(root.join("secret.txt"), fs::Permissions::from_mode(0o000)).unwrap();
    fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o000)).unwrap();

    let result = TreeBuilder::new(&root).build();

    fs::set_permissions(root.join("secret.txt"), fs::Permissions::from_mode(0o644)).unwrap();
    fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();

    let tree = result.unwrap();
    for name in ["secret.txt", "locked"] {
        assert_eq!(
            tree.root.child(name).unwrap().error_detail().unwrap().kind,
            EntryErrorKind::PermissionDenied,
            "{}",
            name
        );
    }
    assert!(tree.root.child("open.txt").unwrap().is_file());
}

#[test]
fn test_unreadable_file_aborts_fail_fast() {
    let temp_dir = TempDir::new().unwrap();
    if !permissions_are_enforced(&temp_dir) {
        eprintln!("skipping: permissions are not enforced for this user");
        return;
    }
    let root = fixture(&temp_dir, "data", &[("secret.txt", "hidden"), ("a.txt", "a")]);
    fs::set_permissions(root.join("secret.txt"), fs::Permissions::from_mode(0o000)).unwrap();

    let result = TreeBuilder::new(&root)
        .with_policy(ErrorPolicy::FailFast)
        .build();
    fs::set_permissions(root.join("secret.txt"), fs::Permissions::from_mode(0o644)).unwrap();

    assert!(matches!(
        result,
        Err(BuildError::Aborted { ref error, .. }) if error.kind == EntryErrorKind::PermissionDenied
    ));
}
