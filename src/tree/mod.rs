//! Directory Merkle Tree
//!
//! Represents a directory hierarchy as a Merkle tree, where each file or
//! directory carries a content digest and directories combine the digests
//! of their children independently of names and order.

pub mod builder;
pub mod classify;
pub mod hasher;
pub mod node;
pub mod path;
pub mod source;

pub use builder::{ErrorPolicy, Tree, TreeBuilder};
pub use node::{Node, NodeKind};
pub use source::TreeSource;
