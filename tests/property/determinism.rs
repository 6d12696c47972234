//! Property-based tests for determinism guarantees

use dmerk::compare::{compare, DiffStatus};
use dmerk::error::{EntryError, EntryErrorKind};
use dmerk::store;
use dmerk::tree::hasher::{combine_digests, hash_bytes};
use dmerk::tree::{Node, Tree};
use dmerk::types::Digest;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn digest_strategy() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest::from_bytes)
}

fn leaf_strategy() -> impl Strategy<Value = Node> {
    prop_oneof![
        4 => (any::<Vec<u8>>()).prop_map(|content| {
            Node::file("leaf", hash_bytes(&content), content.len() as u64)
        }),
        1 => Just(Node::error(
            "leaf",
            EntryError::new(EntryErrorKind::PermissionDenied, "denied"),
        )),
    ]
}

/// Arbitrary trees; names are reassigned from the map keys.
fn node_strategy() -> impl Strategy<Value = Node> {
    leaf_strategy().prop_recursive(4, 48, 6, |inner| {
        prop::collection::btree_map("[a-z]{1,6}", inner, 0..6).prop_map(|children| {
            let children: BTreeMap<String, Node> = children
                .into_iter()
                .map(|(name, mut node)| {
                    node.name = name.clone();
                    (name, node)
                })
                .collect();
            Node::directory("root", children)
        })
    })
}

fn tree_of(root: Node) -> Tree {
    let root = match root.kind {
        dmerk::tree::NodeKind::Directory { .. } => root,
        _ => Node::directory("root", BTreeMap::from([(root.name.clone(), root)])),
    };
    Tree::new(PathBuf::from("/generated/root"), root)
}

proptest! {
    #[test]
    fn combine_is_order_independent(mut digests in prop::collection::vec(digest_strategy(), 0..16), seed in any::<u64>()) {
        let forward = combine_digests(digests.iter().copied());
        let n = digests.len();
        if n > 1 {
            digests.rotate_left((seed as usize) % n);
        }
        digests.reverse();
        prop_assert_eq!(forward, combine_digests(digests));
    }

    #[test]
    fn combine_counts_duplicates(digest in digest_strategy()) {
        prop_assert_ne!(combine_digests([digest]), combine_digests([digest, digest]));
    }

    #[test]
    fn serialized_tree_loads_back_identical(root in node_strategy()) {
        let tree = tree_of(root);
        let bytes = store::serialize(&tree).unwrap();
        let loaded = store::deserialize(&bytes).unwrap();
        prop_assert_eq!(loaded.root_digest(), tree.root_digest());
        prop_assert_eq!(loaded, tree);
    }

    #[test]
    fn self_comparison_has_no_differences(root in node_strategy()) {
        let tree = tree_of(root);
        let result = compare(&tree, Path::new("."), &tree, Path::new(".")).unwrap();
        for entry in &result.entries {
            prop_assert!(matches!(entry.status, DiffStatus::Match | DiffStatus::Unknown));
        }
        prop_assert_eq!(result.counts().differ, 0);
    }
}
