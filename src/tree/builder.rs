//! Tree builder for constructing directory merkle trees
//!
//! A build runs in three stages:
//!
//! 1. **Walk**: an explicit work-stack over directories classifies every
//!    entry. Directories get an index larger than their parent's, files
//!    become hash jobs, failures become Error nodes in place.
//! 2. **Hash**: file jobs run on the blocking pool, at most `jobs` at a time.
//! 3. **Assemble**: directories are finalized in reverse discovery order, so
//!    every child is complete before its parent combines the digests.
//!
//! No stage recurses natively, so stack usage does not grow with tree depth.

use crate::config::GenerateConfig;
use crate::error::{BuildError, EntryError, EntryErrorKind};
use crate::tree::classify::{self, Classified};
use crate::tree::hasher::{self, ALGORITHM_VERSION};
use crate::tree::node::Node;
use crate::tree::path;
use crate::types::Digest;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

/// What to do when a single entry cannot be read or classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the whole build on the first entry error.
    FailFast,
    /// Record the entry as an Error node and keep going.
    #[default]
    Collect,
}

impl ErrorPolicy {
    /// Apply the policy to an entry error found at `path`.
    fn admit(self, path: &Path, error: &EntryError) -> Result<(), BuildError> {
        match self {
            ErrorPolicy::FailFast => Err(BuildError::Aborted {
                path: path.to_path_buf(),
                error: error.clone(),
            }),
            ErrorPolicy::Collect => {
                warn!(path = %path.display(), kind = %error.kind, "{}", error.message);
                Ok(())
            }
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::FailFast => f.write_str("fail_fast"),
            ErrorPolicy::Collect => f.write_str("collect"),
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_fast" | "fail-fast" => Ok(ErrorPolicy::FailFast),
            "collect" => Ok(ErrorPolicy::Collect),
            other => Err(format!(
                "Invalid error policy: {} (must be 'fail_fast' or 'collect')",
                other
            )),
        }
    }
}

/// A built directory merkle tree together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    /// Absolute path of the directory the tree was generated from
    pub root_path: PathBuf,
    pub generated_at: DateTime<Utc>,
    /// Digest/combination rule the tree was built with
    pub algorithm_version: u32,
    pub root: Node,
}

impl Tree {
    /// Wrap a root node built with the current algorithm.
    pub fn new(root_path: PathBuf, root: Node) -> Self {
        Self {
            root_path,
            generated_at: Utc::now(),
            algorithm_version: ALGORITHM_VERSION,
            root,
        }
    }

    pub fn root_digest(&self) -> Option<Digest> {
        self.root.digest()
    }

    /// Every Error node in the tree, with its path relative to the root.
    pub fn errors(&self) -> Vec<(PathBuf, &EntryError)> {
        self.root.errors_under(Path::new(""))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}

/// Tree builder for constructing directory merkle trees
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    root: PathBuf,
    policy: ErrorPolicy,
    jobs: usize,
}

/// Number of concurrent hash jobs when none is configured.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl TreeBuilder {
    /// Create a new tree builder for the given root path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: ErrorPolicy::default(),
            jobs: default_jobs(),
        }
    }

    /// Create a builder using the `[generate]` configuration section.
    pub fn from_config(root: impl Into<PathBuf>, config: &GenerateConfig) -> Self {
        let builder = Self::new(root).with_policy(config.error_policy);
        match config.jobs {
            Some(jobs) => builder.with_jobs(jobs),
            None => builder,
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound the number of files hashed concurrently (at least one).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Build the tree on a dedicated runtime.
    ///
    /// Must not be called from inside a tokio runtime; use
    /// [`TreeBuilder::build_async`] there. On a fail-fast abort, hash jobs
    /// still running are abandoned rather than awaited.
    pub fn build(&self) -> Result<Tree, BuildError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(self.jobs)
            .thread_name("dmerk-build")
            .build()
            .map_err(|e| BuildError::Runtime(format!("Failed to start runtime: {}", e)))?;
        let result = runtime.block_on(self.build_async());
        runtime.shutdown_background();
        result
    }

    /// Build the complete tree from the filesystem
    #[instrument(skip(self), fields(root = %self.root.display(), policy = %self.policy, jobs = self.jobs))]
    pub async fn build_async(&self) -> Result<Tree, BuildError> {
        let start = Instant::now();
        info!("Starting tree build");

        let root_path = self.resolve_root()?;
        let root_name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root_path.display().to_string());

        // Stage 1: walk
        let policy = self.policy;
        let walk_root = root_path.clone();
        let plan = tokio::task::spawn_blocking(move || walk(walk_root, root_name, policy))
            .await
            .map_err(|e| BuildError::Runtime(format!("Walk task failed: {}", e)))??;
        debug!(
            directories = plan.dirs.len(),
            files = plan.jobs.len(),
            "Walked filesystem"
        );

        // Stage 2: hash
        let hashed = self.hash_files(&plan.jobs).await?;

        // Stage 3: assemble
        let root = assemble(plan.dirs, hashed)?;
        let tree = Tree::new(root_path, root);

        info!(
            node_count = tree.node_count(),
            error_count = tree.errors().len(),
            root_digest = %tree.root_digest().map(|d| d.to_hex()).unwrap_or_else(|| "-".to_string()),
            duration_ms = start.elapsed().as_millis(),
            "Tree build completed"
        );
        Ok(tree)
    }

    fn resolve_root(&self) -> Result<PathBuf, BuildError> {
        let invalid = |reason: String| BuildError::InvalidRoot {
            path: self.root.clone(),
            reason,
        };
        match classify::classify(&self.root) {
            Classified::Directory => {}
            Classified::File { .. } => return Err(invalid("not a directory".to_string())),
            Classified::Error(error) => return Err(invalid(error.to_string())),
        }
        path::canonicalize_path(&self.root).map_err(|e| invalid(e.to_string()))
    }

    /// Hash every file job with bounded concurrency.
    ///
    /// Results are indexed like `jobs`. Under fail-fast the first failure
    /// raises the cancellation flag and returns; dropping the stream detaches
    /// the jobs still in flight.
    async fn hash_files(&self, jobs: &[FileJob]) -> Result<Vec<Option<Node>>, BuildError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut results: Vec<Option<Node>> = (0..jobs.len()).map(|_| None).collect();

        let mut outcomes = futures::stream::iter(jobs.iter().enumerate().map(|(index, job)| {
            let path = job.path.clone();
            let cancel = Arc::clone(&cancel);
            async move {
                let outcome = tokio::task::spawn_blocking(move || hash_file(&path, &cancel)).await;
                (index, outcome)
            }
        }))
        .buffer_unordered(self.jobs);

        while let Some((index, outcome)) = outcomes.next().await {
            let job = &jobs[index];
            let node = match outcome {
                Ok(Ok((digest, size))) => {
                    trace!(path = %job.path.display(), digest = %digest, size, "Hashed file");
                    Node::file(job.name.clone(), digest, size)
                }
                Ok(Err(error)) => {
                    if let Err(abort) = self.policy.admit(&job.path, &error) {
                        cancel.store(true, Ordering::Relaxed);
                        return Err(abort);
                    }
                    Node::error(job.name.clone(), error)
                }
                Err(e) => {
                    cancel.store(true, Ordering::Relaxed);
                    return Err(BuildError::Runtime(format!("Hash task failed: {}", e)));
                }
            };
            results[index] = Some(node);
        }

        Ok(results)
    }
}

fn hash_file(path: &Path, cancel: &AtomicBool) -> Result<(Digest, u64), EntryError> {
    let file = classify::open_file(path)?;
    hasher::hash_reader(file, cancel).map_err(|e| EntryError::from_io(&e))
}

/// A directory discovered by the walk whose children are not all built yet.
#[derive(Debug)]
struct PendingDir {
    name: String,
    path: PathBuf,
    parent: Option<usize>,
    canonical: PathBuf,
    slots: Vec<Slot>,
    /// Set when the directory itself could not be listed.
    error: Option<EntryError>,
}

#[derive(Debug)]
enum Slot {
    Ready(Node),
    File(usize),
    Dir(usize),
}

#[derive(Debug)]
struct FileJob {
    name: String,
    path: PathBuf,
}

#[derive(Debug)]
struct WalkPlan {
    dirs: Vec<PendingDir>,
    jobs: Vec<FileJob>,
}

fn walk(root: PathBuf, root_name: String, policy: ErrorPolicy) -> Result<WalkPlan, BuildError> {
    let mut dirs = vec![PendingDir {
        name: root_name,
        canonical: root.clone(),
        path: root,
        parent: None,
        slots: Vec::new(),
        error: None,
    }];
    let mut jobs = Vec::new();
    let mut stack = vec![0usize];

    while let Some(index) = stack.pop() {
        let dir_path = dirs[index].path.clone();
        let listed = match classify::list_directory(&dir_path) {
            Ok(listed) => listed,
            Err(error) => {
                policy.admit(&dir_path, &error)?;
                dirs[index].error = Some(error);
                continue;
            }
        };
        trace!(path = %dir_path.display(), entries = listed.len(), "Listed directory");

        for entry in listed {
            if let Some(error) = entry.name_error {
                policy.admit(&entry.path, &error)?;
                dirs[index].slots.push(Slot::Ready(Node::error(entry.name, error)));
                continue;
            }

            let slot = match classify::classify(&entry.path) {
                Classified::File { .. } => {
                    jobs.push(FileJob {
                        name: entry.name,
                        path: entry.path,
                    });
                    Slot::File(jobs.len() - 1)
                }
                Classified::Directory => match descend(&dirs, index, &entry.path) {
                    Ok(canonical) => {
                        let child = dirs.len();
                        dirs.push(PendingDir {
                            name: entry.name,
                            path: entry.path,
                            parent: Some(index),
                            canonical,
                            slots: Vec::new(),
                            error: None,
                        });
                        stack.push(child);
                        Slot::Dir(child)
                    }
                    Err(error) => {
                        policy.admit(&entry.path, &error)?;
                        Slot::Ready(Node::error(entry.name, error))
                    }
                },
                Classified::Error(error) => {
                    policy.admit(&entry.path, &error)?;
                    Slot::Ready(Node::error(entry.name, error))
                }
            };
            dirs[index].slots.push(slot);
        }
    }

    Ok(WalkPlan { dirs, jobs })
}

/// Canonical path of a directory about to be descended into, unless it is
/// one of its own ancestors (reached through a symlink).
fn descend(dirs: &[PendingDir], parent: usize, path: &Path) -> Result<PathBuf, EntryError> {
    let canonical = path::canonicalize_path(path).map_err(|e| EntryError::from_io(&e))?;
    let mut cursor = Some(parent);
    while let Some(index) = cursor {
        if dirs[index].canonical == canonical {
            return Err(EntryError::new(
                EntryErrorKind::SymlinkLoop,
                format!("leads back to ancestor {}", canonical.display()),
            ));
        }
        cursor = dirs[index].parent;
    }
    Ok(canonical)
}

fn assemble(dirs: Vec<PendingDir>, mut files: Vec<Option<Node>>) -> Result<Node, BuildError> {
    let missing = |what: &str| BuildError::Runtime(format!("Missing {} during assembly", what));
    let mut built: Vec<Option<Node>> = (0..dirs.len()).map(|_| None).collect();

    for (index, dir) in dirs.into_iter().enumerate().rev() {
        let node = match dir.error {
            Some(error) => Node::error(dir.name, error),
            None => {
                let mut children = BTreeMap::new();
                for slot in dir.slots {
                    let child = match slot {
                        Slot::Ready(node) => node,
                        Slot::File(job) => files[job].take().ok_or_else(|| missing("file digest"))?,
                        Slot::Dir(child) => built[child].take().ok_or_else(|| missing("subdirectory"))?,
                    };
                    insert_unique(&mut children, child);
                }
                let node = Node::directory(dir.name, children);
                debug!(path = %dir.path.display(), digest = ?node.digest(), "Directory digest computed");
                node
            }
        };
        built[index] = Some(node);
    }

    built
        .first_mut()
        .and_then(Option::take)
        .ok_or_else(|| missing("root directory"))
}

/// Insert a child, renaming it with a `~N` suffix if a lossily-decoded name
/// collides with an existing sibling.
fn insert_unique(children: &mut BTreeMap<String, Node>, mut node: Node) {
    if children.contains_key(&node.name) {
        let base = node.name.clone();
        let mut n = 1;
        while children.contains_key(&format!("{}~{}", base, n)) {
            n += 1;
        }
        node.name = format!("{}~{}", base, n);
    }
    children.insert(node.name.clone(), node);
}
