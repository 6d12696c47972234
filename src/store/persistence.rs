//! File persistence for trees

use crate::error::StoreError;
use crate::store::{deserialize, serialize};
use crate::tree::builder::Tree;
use rand::Rng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Extension of persisted tree files.
pub const TREE_FILE_EXTENSION: &str = "dmerk";

/// Write `tree` to `path`, replacing any existing file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn save(tree: &Tree, path: &Path) -> Result<(), StoreError> {
    let bytes = serialize(tree)?;
    let mut file = fs::File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    info!(bytes = bytes.len(), root = %tree.root_path.display(), "Saved tree");
    Ok(())
}

/// Read a tree from `path`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load(path: &Path) -> Result<Tree, StoreError> {
    let bytes = fs::read(path)?;
    let tree = deserialize(&bytes)?;
    debug!(node_count = tree.node_count(), "Loaded tree");
    Ok(tree)
}

/// Saves trees into a directory under names derived from their root.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save under `<root-name>.dmerk`, or `<root-name>_<8 hex>.dmerk` if taken.
    pub fn save(&self, tree: &Tree) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir)?;
        let stem = tree
            .root_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        let path = self.available_path(&stem);
        save(tree, &path)?;
        Ok(path)
    }

    fn available_path(&self, stem: &str) -> PathBuf {
        let mut path = self.dir.join(format!("{}.{}", stem, TREE_FILE_EXTENSION));
        let mut rng = rand::thread_rng();
        while path.exists() {
            let suffix: u32 = rng.gen();
            path = self
                .dir
                .join(format!("{}_{:08x}.{}", stem, suffix, TREE_FILE_EXTENSION));
        }
        path
    }
}

/// True when `path` names an existing persisted tree file.
pub fn is_tree_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map_or(false, |ext| ext == TREE_FILE_EXTENSION)
}
