//! Deep digest matching between two subtrees
//!
//! Pairs up content that appears in both trees regardless of where it lives:
//! moved, renamed and duplicated files or directories. A node whose digest
//! (and kind) occurs anywhere on the other side is matched and not descended
//! into; unmatched directories are expanded; unmatched files and empty
//! directories are reported as unique to their side.

use crate::tree::node::Node;
use crate::types::Digest;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Content present on both sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchGroup {
    pub digest: Digest,
    pub is_dir: bool,
    pub left: Vec<PathBuf>,
    pub right: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub matches: Vec<MatchGroup>,
    pub only_left: Vec<PathBuf>,
    pub only_right: Vec<PathBuf>,
    /// Error nodes: their content cannot be matched
    pub unknown_left: Vec<PathBuf>,
    pub unknown_right: Vec<PathBuf>,
}

impl MatchReport {
    /// True when nothing is unique to either side and nothing is unknown.
    pub fn is_complete_match(&self) -> bool {
        self.only_left.is_empty()
            && self.only_right.is_empty()
            && self.unknown_left.is_empty()
            && self.unknown_right.is_empty()
    }
}

type ContentKey = (Digest, bool);

/// Every digest-carrying node under `root`, keyed by (digest, is_dir).
fn index_subtree(root: &Node) -> HashMap<ContentKey, Vec<PathBuf>> {
    let mut index: HashMap<ContentKey, Vec<PathBuf>> = HashMap::new();
    let mut stack: Vec<(PathBuf, &Node)> = vec![(PathBuf::new(), root)];
    while let Some((path, node)) = stack.pop() {
        if let Some(digest) = node.digest() {
            index.entry((digest, node.is_dir())).or_default().push(path.clone());
        }
        if let Some(children) = node.children() {
            for child in children.values() {
                stack.push((path.join(&child.name), child));
            }
        }
    }
    for paths in index.values_mut() {
        paths.sort();
    }
    index
}

#[derive(Default)]
struct SideWalk {
    matched: BTreeMap<ContentKey, Vec<PathBuf>>,
    unique: Vec<PathBuf>,
    unknown: Vec<PathBuf>,
}

/// Breadth-first walk of one side against the other side's index.
fn walk_side(root: &Node, other: &HashMap<ContentKey, Vec<PathBuf>>) -> SideWalk {
    let mut walk = SideWalk::default();
    let mut queue: VecDeque<(PathBuf, &Node)> = VecDeque::new();
    queue.push_back((PathBuf::new(), root));

    while let Some((path, node)) = queue.pop_front() {
        let Some(digest) = node.digest() else {
            walk.unknown.push(path);
            continue;
        };
        let key = (digest, node.is_dir());
        if other.contains_key(&key) {
            walk.matched.entry(key).or_default().push(path);
            continue;
        }
        match node.children() {
            Some(children) if !children.is_empty() => {
                for child in children.values() {
                    queue.push_back((path.join(&child.name), child));
                }
            }
            _ => walk.unique.push(path),
        }
    }
    walk
}

/// Match the content of `left` against the content of `right`.
///
/// Paths in the report are relative to the two given nodes; the empty path
/// denotes the node itself.
#[instrument(skip_all, fields(left = %left.name, right = %right.name))]
pub fn find_matches(left: &Node, right: &Node) -> MatchReport {
    let left_index = index_subtree(left);
    let right_index = index_subtree(right);

    let left_walk = walk_side(left, &right_index);
    let right_walk = walk_side(right, &left_index);

    let mut keys: Vec<ContentKey> = left_walk
        .matched
        .keys()
        .chain(right_walk.matched.keys())
        .copied()
        .collect();
    keys.sort();
    keys.dedup();

    // A node matched on one side may sit inside a matched ancestor on the
    // other; fall back to every occurrence from the index then.
    let side_paths = |walk: &SideWalk, index: &HashMap<ContentKey, Vec<PathBuf>>, key: &ContentKey| {
        walk.matched
            .get(key)
            .or_else(|| index.get(key))
            .cloned()
            .unwrap_or_default()
    };

    let mut matches: Vec<MatchGroup> = keys
        .iter()
        .map(|key| MatchGroup {
            digest: key.0,
            is_dir: key.1,
            left: side_paths(&left_walk, &left_index, key),
            right: side_paths(&right_walk, &right_index, key),
        })
        .collect();
    matches.sort_by(|a, b| a.left.first().cmp(&b.left.first()).then(a.digest.cmp(&b.digest)));

    let mut report = MatchReport {
        matches,
        only_left: left_walk.unique,
        only_right: right_walk.unique,
        unknown_left: left_walk.unknown,
        unknown_right: right_walk.unknown,
    };
    report.only_left.sort();
    report.only_right.sort();
    report.unknown_left.sort();
    report.unknown_right.sort();

    debug!(
        groups = report.matches.len(),
        only_left = report.only_left.len(),
        only_right = report.only_right.len(),
        "Deep match complete"
    );
    report
}
