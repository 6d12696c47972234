//! Tree nodes: File, Directory or Error, each named after its filesystem entry.

use crate::error::EntryError;
use crate::types::Digest;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A single entry of a directory merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File {
        digest: Digest,
        size: u64,
    },
    Directory {
        digest: Digest,
        size: u64,
        /// Keyed by child name; iteration is always name-sorted.
        children: BTreeMap<String, Node>,
    },
    Error {
        detail: EntryError,
    },
}

impl Node {
    pub fn file(name: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File { digest, size },
        }
    }

    /// Build a directory node from its children, deriving digest and size.
    ///
    /// Error children are kept in `children` but contribute neither digest
    /// nor size.
    pub fn directory(name: impl Into<String>, children: BTreeMap<String, Node>) -> Self {
        let digest = crate::tree::hasher::combine_digests(
            children.values().filter_map(|child| child.digest()),
        );
        let size = children.values().filter_map(|child| child.size()).sum();
        Self {
            name: name.into(),
            kind: NodeKind::Directory {
                digest,
                size,
                children,
            },
        }
    }

    pub fn error(name: impl Into<String>, detail: EntryError) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Error { detail },
        }
    }

    pub fn digest(&self) -> Option<Digest> {
        match &self.kind {
            NodeKind::File { digest, .. } | NodeKind::Directory { digest, .. } => Some(*digest),
            NodeKind::Error { .. } => None,
        }
    }

    pub fn size(&self) -> Option<u64> {
        match &self.kind {
            NodeKind::File { size, .. } | NodeKind::Directory { size, .. } => Some(*size),
            NodeKind::Error { .. } => None,
        }
    }

    /// Children of a directory; `None` for files and errors.
    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match &self.kind {
            NodeKind::Directory { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().and_then(|children| children.get(name))
    }

    pub fn error_detail(&self) -> Option<&EntryError> {
        match &self.kind {
            NodeKind::Error { detail } => Some(detail),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error { .. })
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            NodeKind::File { .. } => "file",
            NodeKind::Directory { .. } => "directory",
            NodeKind::Error { .. } => "error",
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            if let Some(children) = node.children() {
                stack.extend(children.values());
            }
        }
        count
    }

    /// Every Error node below (or at) this node, with its path relative to `base`.
    ///
    /// Paths are name-sorted.
    pub fn errors_under<'a>(&'a self, base: &Path) -> Vec<(PathBuf, &'a EntryError)> {
        let mut found = Vec::new();
        let mut stack = vec![(base.to_path_buf(), self)];
        while let Some((path, node)) = stack.pop() {
            match &node.kind {
                NodeKind::Error { detail } => found.push((path, detail)),
                NodeKind::Directory { children, .. } => {
                    for child in children.values().rev() {
                        stack.push((path.join(&child.name), child));
                    }
                }
                NodeKind::File { .. } => {}
            }
        }
        found
    }
}

impl Drop for NodeKind {
    // Deep chains would otherwise be freed one stack frame per level.
    fn drop(&mut self) {
        let NodeKind::Directory { children, .. } = self else {
            return;
        };
        let mut stack: Vec<Node> = std::mem::take(children).into_values().collect();
        while let Some(mut node) = stack.pop() {
            if let NodeKind::Directory { children, .. } = &mut node.kind {
                stack.extend(std::mem::take(children).into_values());
            }
        }
    }
}
