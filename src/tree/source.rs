//! Where a tree comes from: a directory to build, or a persisted file to load

use crate::config::GenerateConfig;
use crate::error::ApiError;
use crate::store;
use crate::tree::builder::{Tree, TreeBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSource {
    /// Build a fresh tree from this directory
    Directory(PathBuf),
    /// Load a previously saved tree
    Persisted(PathBuf),
}

impl TreeSource {
    /// A path naming an existing `.dmerk` file is persisted; anything else
    /// is treated as a directory to build.
    pub fn detect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if store::is_tree_file(&path) {
            TreeSource::Persisted(path)
        } else {
            TreeSource::Directory(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            TreeSource::Directory(path) | TreeSource::Persisted(path) => path,
        }
    }

    /// True when obtaining the tree builds it from the filesystem.
    pub fn is_fresh(&self) -> bool {
        matches!(self, TreeSource::Directory(_))
    }

    pub fn obtain(&self, config: &GenerateConfig) -> Result<Tree, ApiError> {
        match self {
            TreeSource::Directory(path) => {
                debug!(path = %path.display(), "Building tree from directory");
                Ok(TreeBuilder::from_config(path, config).build()?)
            }
            TreeSource::Persisted(path) => {
                debug!(path = %path.display(), "Loading persisted tree");
                Ok(store::load(path)?)
            }
        }
    }
}
