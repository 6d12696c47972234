//! Error types for directory merkle tree generation, persistence and comparison.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single filesystem entry could not be turned into a File or Directory node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryErrorKind {
    PermissionDenied,
    BrokenSymlink,
    UnsupportedSpecialFile,
    InvalidUtf8Name,
    SymlinkLoop,
    IoFailure,
}

impl fmt::Display for EntryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryErrorKind::PermissionDenied => "permission denied",
            EntryErrorKind::BrokenSymlink => "broken symlink",
            EntryErrorKind::UnsupportedSpecialFile => "unsupported special file",
            EntryErrorKind::InvalidUtf8Name => "invalid UTF-8 name",
            EntryErrorKind::SymlinkLoop => "symlink loop",
            EntryErrorKind::IoFailure => "I/O failure",
        };
        f.write_str(s)
    }
}

/// Per-entry failure. Recoverable: under the collect policy it is stored in
/// the tree as an Error node instead of being raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct EntryError {
    pub kind: EntryErrorKind,
    pub message: String,
}

impl EntryError {
    pub fn new(kind: EntryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Map an I/O error raised while stat-ing, opening, listing or reading an entry.
    pub fn from_io(err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::PermissionDenied => EntryErrorKind::PermissionDenied,
            _ => EntryErrorKind::IoFailure,
        };
        Self::new(kind, err.to_string())
    }
}

/// Errors that abort a tree build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid root {path:?}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Build aborted at {path:?}: {error}")]
    Aborted { path: PathBuf, error: EntryError },

    #[error("Build runtime error: {0}")]
    Runtime(String),
}

/// Errors raised while persisting or loading a tree.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed persisted tree: {0}")]
    Malformed(String),

    #[error("Incompatible algorithm version: tree uses {found}, supported is {supported}")]
    IncompatibleAlgorithmVersion { found: u32, supported: u32 },
}

/// Errors raised by a single compare call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompareError {
    #[error("Incompatible algorithm version: tree rooted at {root:?} uses {found}, supported is {supported}")]
    IncompatibleAlgorithmVersion {
        root: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("Subpath {subpath:?} not found: no entry named {segment:?}")]
    SubpathNotFound { subpath: PathBuf, segment: String },

    #[error("Subpath {0:?} is not a directory")]
    NotADirectory(PathBuf),
}

/// Top-level errors surfaced by the command-line front-end.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Compare(#[from] CompareError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
