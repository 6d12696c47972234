//! Integration tests running the dmerk binary

use crate::integration::fixture;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn dmerk(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dmerk"))
        .current_dir(cwd)
        .env("XDG_CONFIG_HOME", cwd.join(".no-config"))
        .env_remove("DMERK_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_generate_then_compare_saved_trees() {
    let temp_dir = TempDir::new().unwrap();
    fixture(&temp_dir, "A", &[("x.txt", "hi"), ("y/z.txt", "yo")]);
    fixture(&temp_dir, "B", &[("x.txt", "hi"), ("y/z.txt", "yo!")]);

    let output = dmerk(temp_dir.path(), &["generate", "A"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(temp_dir.path().join("A.dmerk").is_file());
    let output = dmerk(temp_dir.path(), &["generate", "B", "-f", "b-tree.dmerk"]);
    assert_eq!(output.status.code(), Some(0));

    let output = dmerk(
        temp_dir.path(),
        &["compare", "--path1", "A.dmerk", "--path2", "b-tree.dmerk", "--format", "json"],
    );
    assert_eq!(output.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["entries"][0]["name"], "x.txt");
    assert_eq!(value["entries"][0]["status"], "match");
    assert_eq!(value["entries"][1]["status"], "differ");
}

#[test]
fn test_generate_print_writes_document_to_stdout_only() {
    let temp_dir = TempDir::new().unwrap();
    fixture(&temp_dir, "docs", &[("a.txt", "a")]);

    let output = dmerk(temp_dir.path(), &["--log-level", "debug", "generate", "docs", "--no-save"]);
    assert_eq!(output.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["algorithm_version"], 1);
    assert_eq!(value["root"]["children"][0]["name"], "a.txt");
    assert!(!temp_dir.path().join("docs.dmerk").exists());
}

#[cfg(unix)]
#[test]
fn test_exit_statuses_for_broken_symlink() {
    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("ok.txt", "ok")]);
    std::os::unix::fs::symlink(root.join("gone"), root.join("dead")).unwrap();

    let collected = dmerk(temp_dir.path(), &["--quiet", "generate", "data", "--no-save"]);
    assert_eq!(collected.status.code(), Some(2));

    let aborted = dmerk(temp_dir.path(), &["--quiet", "generate", "data", "--fail-fast"]);
    assert_eq!(aborted.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&aborted.stderr).contains("error:"));
    assert!(!temp_dir.path().join("data.dmerk").exists());

    let errors = dmerk(temp_dir.path(), &["--quiet", "errors", "data", "--format", "json"]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&errors)).unwrap();
    assert_eq!(value[0]["path"], "dead");
    assert_eq!(value[0]["kind"], "broken_symlink");
}

#[test]
fn test_bad_subpath_fails() {
    let temp_dir = TempDir::new().unwrap();
    fixture(&temp_dir, "docs", &[("a.txt", "a")]);
    let output = dmerk(temp_dir.path(), &["--quiet", "show", "docs", "missing"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing"));
}

#[test]
fn test_show_lists_children() {
    let temp_dir = TempDir::new().unwrap();
    fixture(&temp_dir, "docs", &[("a.txt", "a"), ("sub/b.txt", "b")]);
    let output = dmerk(temp_dir.path(), &["--quiet", "show", "docs", "--format", "json"]);
    assert_eq!(output.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["kind"], "directory");
    assert_eq!(value["children"][1]["name"], "sub");
    assert_eq!(value["children"][1]["size"], 1);
}
