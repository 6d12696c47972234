//! Persisted tree representation
//!
//! A tree is stored as a self-describing JSON document:
//!
//! ```json
//! { "root_path": "/abs/dir", "algorithm_version": 1,
//!   "generated_at": "2026-01-01T00:00:00Z",
//!   "root": { "name": "dir", "kind": "directory", "digest": "…", "size": 2,
//!             "children": [ { "name": "x", "kind": "file", "digest": "…", "size": 2 } ] } }
//! ```
//!
//! Children are written sorted by name. Decoding re-derives every directory's
//! digest and size from its children and rejects records that disagree.

pub mod persistence;

pub use persistence::{is_tree_file, load, save, FileStore, TREE_FILE_EXTENSION};

use crate::error::{EntryError, StoreError};
use crate::tree::builder::Tree;
use crate::tree::hasher::ALGORITHM_VERSION;
use crate::tree::node::{Node, NodeKind};
use crate::types::Digest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Deepest directory nesting a document may describe. A path of `d` levels
/// needs at least `2d` bytes, so deeper trees cannot exist under a 4096-byte
/// `PATH_MAX`.
pub const MAX_TREE_DEPTH: usize = 2048;

/// JSON nesting allowed for [`MAX_TREE_DEPTH`]: the document object, then an
/// object and a `children` array per directory level.
const MAX_JSON_NESTING: usize = 2 * MAX_TREE_DEPTH + 2;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Kind tag of a persisted node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    File,
    Directory,
    Error,
}

/// NodeRecord: one persisted node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_children"
    )]
    pub children: Option<Vec<NodeRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryError>,
}

fn serialize_children<S: Serializer>(
    children: &Option<Vec<NodeRecord>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || children.serialize(serializer))
}

/// Top-level persisted document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDocument {
    pub root_path: PathBuf,
    pub algorithm_version: u32,
    pub generated_at: DateTime<Utc>,
    pub root: NodeRecord,
}

/// Only the version tag, decoded before anything else.
#[derive(Deserialize)]
struct DocumentHeader {
    algorithm_version: u32,
}

impl NodeRecord {
    /// Convert a node and its whole subtree into records.
    pub fn from_node(node: &Node) -> Self {
        // Breadth-first, so the children of each node occupy consecutive slots
        // and every child sits after its parent.
        let mut order: Vec<(usize, &Node)> = vec![(0, node)];
        let mut i = 0;
        while i < order.len() {
            let current = order[i].1;
            if let Some(children) = current.children() {
                for child in children.values() {
                    order.push((i, child));
                }
            }
            i += 1;
        }

        let mut pending: Vec<Vec<NodeRecord>> = order.iter().map(|_| Vec::new()).collect();
        for index in (1..order.len()).rev() {
            let (parent, child) = order[index];
            let mut children = std::mem::take(&mut pending[index]);
            children.reverse();
            pending[parent].push(NodeRecord::shallow(child, children));
        }
        let mut children = std::mem::take(&mut pending[0]);
        children.reverse();
        NodeRecord::shallow(node, children)
    }

    fn shallow(node: &Node, children: Vec<NodeRecord>) -> Self {
        let mut record = NodeRecord {
            name: node.name.clone(),
            kind: RecordKind::File,
            digest: node.digest(),
            size: node.size(),
            children: None,
            error: None,
        };
        match &node.kind {
            NodeKind::File { .. } => {}
            NodeKind::Directory { .. } => {
                record.kind = RecordKind::Directory;
                record.children = Some(children);
            }
            NodeKind::Error { detail } => {
                record.kind = RecordKind::Error;
                record.error = Some(detail.clone());
            }
        }
        record
    }

    /// Validate and convert back into a [`Node`].
    pub fn into_node(self) -> Result<Node, StoreError> {
        struct Slot {
            parent: Option<usize>,
            record: NodeRecord,
            children: BTreeMap<String, Node>,
        }

        let mut slots = vec![Slot {
            parent: None,
            record: self,
            children: BTreeMap::new(),
        }];
        let mut i = 0;
        while i < slots.len() {
            let records = slots[i].record.take_children()?;
            for record in records.into_iter().flatten() {
                slots.push(Slot {
                    parent: Some(i),
                    record,
                    children: BTreeMap::new(),
                });
            }
            i += 1;
        }

        // Parents sit at lower indices than their children.
        while let Some(slot) = slots.pop() {
            let node = slot.record.finish(slot.children)?;
            match slot.parent {
                Some(p) => {
                    let parent = &mut slots[p];
                    if parent.children.contains_key(&node.name) {
                        return Err(StoreError::Malformed(format!(
                            "node {:?}: duplicate child name {:?}",
                            parent.record.name, node.name
                        )));
                    }
                    parent.children.insert(node.name.clone(), node);
                }
                None => return Ok(node),
            }
        }
        Err(StoreError::Malformed("document has no root node".to_string()))
    }

    /// Check the fields allowed for this kind and detach the child records.
    fn take_children(&mut self) -> Result<Option<Vec<NodeRecord>>, StoreError> {
        let violation = match self.kind {
            RecordKind::File if self.children.is_some() || self.error.is_some() => {
                Some("file must not carry children or error")
            }
            RecordKind::Directory if self.error.is_some() => {
                Some("directory must not carry an error")
            }
            RecordKind::Directory if self.children.is_none() => Some("missing children"),
            RecordKind::Error
                if self.digest.is_some() || self.size.is_some() || self.children.is_some() =>
            {
                Some("error node must not carry digest, size or children")
            }
            _ => None,
        };
        match violation {
            Some(msg) => Err(self.malformed(msg)),
            None => Ok(self.children.take()),
        }
    }

    fn finish(mut self, children: BTreeMap<String, Node>) -> Result<Node, StoreError> {
        match self.kind {
            RecordKind::File => {
                let digest = self.digest.ok_or_else(|| self.malformed("missing digest"))?;
                let size = self.size.ok_or_else(|| self.malformed("missing size"))?;
                Ok(Node::file(std::mem::take(&mut self.name), digest, size))
            }
            RecordKind::Directory => {
                let digest = self.digest.ok_or_else(|| self.malformed("missing digest"))?;
                let size = self.size.ok_or_else(|| self.malformed("missing size"))?;
                let node = Node::directory(std::mem::take(&mut self.name), children);
                if node.digest() != Some(digest) {
                    return Err(StoreError::Malformed(format!(
                        "node {:?}: directory digest does not match its children",
                        node.name
                    )));
                }
                if node.size() != Some(size) {
                    return Err(StoreError::Malformed(format!(
                        "node {:?}: directory size does not match its children",
                        node.name
                    )));
                }
                Ok(node)
            }
            RecordKind::Error => {
                let detail = self
                    .error
                    .take()
                    .ok_or_else(|| self.malformed("missing error detail"))?;
                Ok(Node::error(std::mem::take(&mut self.name), detail))
            }
        }
    }

    fn malformed(&self, msg: &str) -> StoreError {
        StoreError::Malformed(format!("node {:?}: {}", self.name, msg))
    }
}

impl Drop for NodeRecord {
    fn drop(&mut self) {
        let mut stack = self.children.take().unwrap_or_default();
        while let Some(mut record) = stack.pop() {
            stack.extend(record.children.take().unwrap_or_default());
        }
    }
}

impl TreeDocument {
    pub fn from_tree(tree: &Tree) -> Self {
        Self {
            root_path: tree.root_path.clone(),
            algorithm_version: tree.algorithm_version,
            generated_at: tree.generated_at,
            root: NodeRecord::from_node(&tree.root),
        }
    }

    pub fn into_tree(self) -> Result<Tree, StoreError> {
        if self.algorithm_version != ALGORITHM_VERSION {
            return Err(StoreError::IncompatibleAlgorithmVersion {
                found: self.algorithm_version,
                supported: ALGORITHM_VERSION,
            });
        }
        Ok(Tree {
            root_path: self.root_path,
            generated_at: self.generated_at,
            algorithm_version: self.algorithm_version,
            root: self.root.into_node()?,
        })
    }
}

/// Encode a tree as its persisted JSON bytes.
pub fn serialize(tree: &Tree) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&TreeDocument::from_tree(tree))
        .map_err(|e| StoreError::Malformed(format!("Failed to serialize tree: {}", e)))
}

/// Decode persisted JSON bytes into a tree.
///
/// The nesting depth is bounded before anything is parsed, and the algorithm
/// version is checked before any node is decoded.
pub fn deserialize(bytes: &[u8]) -> Result<Tree, StoreError> {
    check_nesting(bytes)?;

    let header: DocumentHeader = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Malformed(format!("Failed to read document header: {}", e)))?;
    if header.algorithm_version != ALGORITHM_VERSION {
        return Err(StoreError::IncompatibleAlgorithmVersion {
            found: header.algorithm_version,
            supported: ALGORITHM_VERSION,
        });
    }

    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    deserializer.disable_recursion_limit();
    let stacked = serde_stacker::Deserializer {
        de: &mut deserializer,
        red_zone: STACK_RED_ZONE,
        stack_size: STACK_GROWTH,
    };
    let document = TreeDocument::deserialize(stacked)
        .map_err(|e| StoreError::Malformed(format!("Failed to deserialize tree: {}", e)))?;
    deserializer
        .end()
        .map_err(|e| StoreError::Malformed(format!("Trailing data after tree: {}", e)))?;

    document.into_tree()
}

/// Reject documents nested deeper than [`MAX_JSON_NESTING`] without parsing them.
fn check_nesting(bytes: &[u8]) -> Result<(), StoreError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &byte in bytes {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > MAX_JSON_NESTING {
                    return Err(StoreError::Malformed(format!(
                        "tree is nested deeper than {} levels",
                        MAX_TREE_DEPTH
                    )));
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}
