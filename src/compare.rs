//! Tree Comparison
//!
//! Shallow comparison of two directory nodes, each addressed by a subpath in
//! its own tree. Children are paired by exact name and classified by digest.
//! Comparison is synchronous and never touches the filesystem.

pub mod matching;

pub use matching::{find_matches, MatchGroup, MatchReport};

use crate::error::{CompareError, EntryErrorKind};
use crate::tree::builder::Tree;
use crate::tree::hasher::ALGORITHM_VERSION;
use crate::tree::node::Node;
use crate::tree::path::subpath_segments;
use crate::types::Digest;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Classification of one child name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    /// Present on both sides with equal digests and the same kind
    Match,
    /// Present on both sides, digests or kinds differ
    Differ,
    /// Present only in the left tree
    RemovedFromA,
    /// Present only in the right tree
    AddedInB,
    /// At least one side is an Error node
    Unknown,
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiffStatus::Match => "match",
            DiffStatus::Differ => "differ",
            DiffStatus::RemovedFromA => "removed",
            DiffStatus::AddedInB => "added",
            DiffStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// What one side of a diff entry looks like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryErrorKind>,
}

impl EntrySummary {
    pub fn of(node: &Node) -> Self {
        Self {
            kind: node.kind_label(),
            digest: node.digest(),
            size: node.size(),
            error: node.error_detail().map(|e| e.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub name: String,
    pub status: DiffStatus,
    pub left: Option<EntrySummary>,
    pub right: Option<EntrySummary>,
}

/// Per-status totals of a [`DiffResult`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    pub matched: usize,
    pub differ: usize,
    pub removed: usize,
    pub added: usize,
    pub unknown: usize,
}

/// Children of two directories, classified and sorted by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub left: PathBuf,
    pub right: PathBuf,
    pub entries: Vec<DiffEntry>,
}

impl DiffResult {
    pub fn counts(&self) -> DiffCounts {
        let mut counts = DiffCounts::default();
        for entry in &self.entries {
            match entry.status {
                DiffStatus::Match => counts.matched += 1,
                DiffStatus::Differ => counts.differ += 1,
                DiffStatus::RemovedFromA => counts.removed += 1,
                DiffStatus::AddedInB => counts.added += 1,
                DiffStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    /// True when every child matched (vacuously true for two empty directories).
    pub fn is_identical(&self) -> bool {
        self.entries.iter().all(|e| e.status == DiffStatus::Match)
    }

    pub fn entry(&self, name: &str) -> Option<&DiffEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Refuse trees built with a different digest/combination rule.
pub fn check_version(tree: &Tree) -> Result<(), CompareError> {
    if tree.algorithm_version != ALGORITHM_VERSION {
        return Err(CompareError::IncompatibleAlgorithmVersion {
            root: tree.root_path.clone(),
            found: tree.algorithm_version,
            supported: ALGORITHM_VERSION,
        });
    }
    Ok(())
}

/// Resolve `subpath` to a node of `tree`.
///
/// `""` and `"."` address the root. Relative segments are exact,
/// case-sensitive child names; an absolute subpath must lie under the
/// tree's root path.
pub fn resolve<'a>(tree: &'a Tree, subpath: &Path) -> Result<&'a Node, CompareError> {
    let segments =
        subpath_segments(&tree.root_path, subpath).ok_or_else(|| CompareError::SubpathNotFound {
            subpath: subpath.to_path_buf(),
            segment: subpath.display().to_string(),
        })?;

    let mut node = &tree.root;
    for segment in segments {
        node = node
            .child(&segment)
            .ok_or_else(|| CompareError::SubpathNotFound {
                subpath: subpath.to_path_buf(),
                segment,
            })?;
    }
    Ok(node)
}

/// Classify a pair of nodes; either side may be absent.
pub fn classify_pair(left: Option<&Node>, right: Option<&Node>) -> DiffStatus {
    match (left, right) {
        (Some(l), Some(r)) => {
            if l.is_error() || r.is_error() {
                DiffStatus::Unknown
            } else if l.is_dir() == r.is_dir() && l.digest() == r.digest() {
                DiffStatus::Match
            } else {
                DiffStatus::Differ
            }
        }
        (Some(l), None) if l.is_error() => DiffStatus::Unknown,
        (None, Some(r)) if r.is_error() => DiffStatus::Unknown,
        (Some(_), None) => DiffStatus::RemovedFromA,
        (None, Some(_)) => DiffStatus::AddedInB,
        (None, None) => DiffStatus::Unknown,
    }
}

/// Compare the immediate children of two directory nodes.
#[instrument(skip(left, right), fields(left_root = %left.root_path.display(), right_root = %right.root_path.display()))]
pub fn compare(
    left: &Tree,
    left_subpath: &Path,
    right: &Tree,
    right_subpath: &Path,
) -> Result<DiffResult, CompareError> {
    check_version(left)?;
    check_version(right)?;

    let left_node = resolve(left, left_subpath)?;
    let right_node = resolve(right, right_subpath)?;
    let left_children = left_node
        .children()
        .ok_or_else(|| CompareError::NotADirectory(left_subpath.to_path_buf()))?;
    let right_children = right_node
        .children()
        .ok_or_else(|| CompareError::NotADirectory(right_subpath.to_path_buf()))?;

    let names: BTreeSet<&String> = left_children.keys().chain(right_children.keys()).collect();
    let entries: Vec<DiffEntry> = names
        .into_iter()
        .map(|name| {
            let l = left_children.get(name);
            let r = right_children.get(name);
            let status = classify_pair(l, r);
            debug!(name = %name, status = %status, "Classified entry");
            DiffEntry {
                name: name.clone(),
                status,
                left: l.map(EntrySummary::of),
                right: r.map(EntrySummary::of),
            }
        })
        .collect();

    let result = DiffResult {
        left: left_subpath.to_path_buf(),
        right: right_subpath.to_path_buf(),
        entries,
    };
    let counts = result.counts();
    info!(
        matched = counts.matched,
        differ = counts.differ,
        removed = counts.removed,
        added = counts.added,
        unknown = counts.unknown,
        "Comparison complete"
    );
    Ok(result)
}

/// Compare two nodes of any kind directly (typically two files).
///
/// Only ever yields `Match`, `Differ` or `Unknown`.
pub fn compare_nodes(
    left: &Tree,
    left_subpath: &Path,
    right: &Tree,
    right_subpath: &Path,
) -> Result<DiffStatus, CompareError> {
    check_version(left)?;
    check_version(right)?;
    let l = resolve(left, left_subpath)?;
    let r = resolve(right, right_subpath)?;
    Ok(classify_pair(Some(l), Some(r)))
}
