//! Integration tests for layered configuration loading

use crate::integration::with_xdg_env;
use dmerk::config::{global_config_path, ConfigLoader, WORKSPACE_CONFIG_FILE};
use dmerk::tree::builder::{ErrorPolicy, TreeBuilder};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_global_path_follows_xdg_config_home() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        assert_eq!(
            global_config_path(),
            Some(test_dir.path().join("config").join("dmerk").join("config.toml"))
        );
    });
}

#[test]
fn test_global_then_workspace_precedence() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("ws");
    fs::create_dir_all(&workspace).unwrap();

    let config = with_xdg_env(&test_dir, || {
        let global = global_config_path().unwrap();
        fs::create_dir_all(global.parent().unwrap()).unwrap();
        fs::write(
            &global,
            "[generate]\nerror_policy = \"fail_fast\"\njobs = 2\n\n[logging]\nlevel = \"info\"\n",
        )
        .unwrap();
        fs::write(
            workspace.join(WORKSPACE_CONFIG_FILE),
            "[generate]\njobs = 5\noutput_dir = \"trees\"\n",
        )
        .unwrap();
        ConfigLoader::load(&workspace).unwrap()
    });

    assert_eq!(config.generate.error_policy, ErrorPolicy::FailFast);
    assert_eq!(config.generate.jobs, Some(5));
    assert_eq!(config.generate.output_dir, Some(PathBuf::from("trees")));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_no_files_yields_defaults() {
    let test_dir = TempDir::new().unwrap();
    let config = with_xdg_env(&test_dir, || ConfigLoader::load(test_dir.path()).unwrap());
    assert_eq!(config.generate.error_policy, ErrorPolicy::Collect);
    assert_eq!(config.logging.output, "stderr");
}

#[test]
fn test_malformed_file_is_an_error() {
    let test_dir = TempDir::new().unwrap();
    let path = test_dir.path().join("broken.toml");
    fs::write(&path, "[generate\njobs = ").unwrap();
    assert!(ConfigLoader::load_from_file(&path).is_err());

    fs::write(&path, "[generate]\nerror_policy = \"sometimes\"\n").unwrap();
    assert!(ConfigLoader::load_from_file(&path).is_err());
}

#[test]
fn test_config_drives_builder() {
    let test_dir = TempDir::new().unwrap();
    let path = test_dir.path().join("dmerk.toml");
    fs::write(&path, "[generate]\nerror_policy = \"fail_fast\"\njobs = 3\n").unwrap();
    let config = ConfigLoader::load_from_file(&path).unwrap();

    let builder = TreeBuilder::from_config(test_dir.path(), &config.generate);
    assert_eq!(builder.policy(), ErrorPolicy::FailFast);
}
