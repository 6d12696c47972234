//! Integration tests for saving and loading trees

use crate::integration::{fixture, write_file};
use dmerk::store::{self, FileStore};
use dmerk::tree::builder::{Tree, TreeBuilder};
use dmerk::tree::hasher::{hash_bytes, ALGORITHM_VERSION};
use dmerk::tree::Node;
use dmerk::StoreError;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_built_tree_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let root = fixture(
        &temp_dir,
        "docs",
        &[("x.txt", "hi"), ("y/z.txt", "yo"), ("y/empty/.keep", "")],
    );
    let tree = TreeBuilder::new(&root).build().unwrap();

    let out = temp_dir.path().join("out");
    let saved = FileStore::new(&out).save(&tree).unwrap();
    assert_eq!(saved, out.join("docs.dmerk"));

    let loaded = store::load(&saved).unwrap();
    assert_eq!(loaded, tree);
    assert_eq!(loaded.generated_at, tree.generated_at);
}

#[cfg(unix)]
#[test]
fn test_error_nodes_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("ok.txt", "ok")]);
    std::os::unix::fs::symlink(root.join("gone"), root.join("dead")).unwrap();
    let tree = TreeBuilder::new(&root).build().unwrap();

    let path = temp_dir.path().join("data.dmerk");
    store::save(&tree, &path).unwrap();
    let loaded = store::load(&path).unwrap();
    assert_eq!(loaded.errors(), tree.errors());
    assert_eq!(loaded.root_digest(), tree.root_digest());
}

#[test]
fn test_deep_tree_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("deep");
    write_file(&root, &format!("{}/leaf", vec!["n"; 150].join("/")), "leaf");
    let tree = TreeBuilder::new(&root).build().unwrap();

    let bytes = store::serialize(&tree).unwrap();
    let loaded = store::deserialize(&bytes).unwrap();
    assert_eq!(loaded.node_count(), 152);
    assert_eq!(loaded.root_digest(), tree.root_digest());
}

fn chain(depth: usize) -> Tree {
    let mut node = Node::file("leaf", hash_bytes(b"leaf"), 4);
    for _ in 0..depth {
        node = Node::directory("n", BTreeMap::from([(node.name.clone(), node)]));
    }
    Tree::new(PathBuf::from("/deep"), node)
}

#[test]
fn test_deepest_allowed_tree_roundtrip() {
    let tree = chain(store::MAX_TREE_DEPTH);
    let bytes = store::serialize(&tree).unwrap();
    let loaded = store::deserialize(&bytes).unwrap();
    assert_eq!(loaded.node_count(), store::MAX_TREE_DEPTH + 1);
    assert_eq!(loaded.root_digest(), tree.root_digest());
}

#[test]
fn test_too_deep_tree_is_malformed() {
    let bytes = store::serialize(&chain(store::MAX_TREE_DEPTH + 1)).unwrap();
    assert!(matches!(store::deserialize(&bytes), Err(StoreError::Malformed(_))));
}

#[test]
fn test_hostile_nesting_is_malformed() {
    let depth = 200_000;
    let doc = format!(
        "{{\"root_path\":\"/x\",\"algorithm_version\":{},\"generated_at\":\"2026-01-01T00:00:00Z\",\"root\":{}{}}}",
        ALGORITHM_VERSION,
        "{\"name\":\"n\",\"kind\":\"directory\",\"children\":[".repeat(depth),
        "]}".repeat(depth),
    );
    let err = store::deserialize(doc.as_bytes()).unwrap_err();
    assert!(matches!(err, StoreError::Malformed(_)));

    let bare = "[".repeat(depth);
    assert!(matches!(
        store::deserialize(bare.as_bytes()),
        Err(StoreError::Malformed(_))
    ));
}

#[test]
fn test_incompatible_version_file_refused() {
    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("a", "a")]);
    let tree = TreeBuilder::new(&root).build().unwrap();

    let mut value: serde_json::Value =
        serde_json::from_slice(&store::serialize(&tree).unwrap()).unwrap();
    value["algorithm_version"] = serde_json::json!(ALGORITHM_VERSION + 1);
    let path = temp_dir.path().join("future.dmerk");
    fs::write(&path, value.to_string()).unwrap();

    let err = store::load(&path).unwrap_err();
    assert!(matches!(
        err,
        StoreError::IncompatibleAlgorithmVersion { found, supported }
            if found == ALGORITHM_VERSION + 1 && supported == ALGORITHM_VERSION
    ));
}

#[test]
fn test_truncated_file_is_malformed() {
    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("a", "a")]);
    let tree = TreeBuilder::new(&root).build().unwrap();
    let bytes = store::serialize(&tree).unwrap();

    let path = temp_dir.path().join("cut.dmerk");
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(store::load(&path), Err(StoreError::Malformed(_))));
}

#[test]
fn test_file_store_keeps_existing_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = fixture(&temp_dir, "data", &[("a", "a")]);
    let tree = TreeBuilder::new(&root).build().unwrap();
    let store = FileStore::new(temp_dir.path().join("out"));

    let first = store.save(&tree).unwrap();
    let before = fs::read(&first).unwrap();
    let second = store.save(&tree).unwrap();

    assert_ne!(first, second);
    assert_eq!(fs::read(&first).unwrap(), before);
    assert!(store::is_tree_file(&second));
}
