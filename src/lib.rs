//! dmerk: Directory Merkle Trees
//!
//! Builds a content-addressed tree over a directory hierarchy, where every
//! file digest covers its bytes and every directory digest covers the
//! multiset of its children's digests. Trees can be saved, reloaded and
//! compared to find what changed between two hierarchies.

pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod tree;
pub mod types;

pub use compare::{compare, compare_nodes, resolve, DiffResult, DiffStatus};
pub use error::{ApiError, BuildError, CompareError, EntryError, EntryErrorKind, StoreError};
pub use tree::{ErrorPolicy, Node, NodeKind, Tree, TreeBuilder, TreeSource};
pub use types::Digest;
