//! Filesystem entry classification and directory listing
//!
//! Every entry is reduced to one of three outcomes: a regular file, a
//! directory, or an [`EntryError`]. Symlinks are resolved transparently.

use crate::error::{EntryError, EntryErrorKind};
use std::ffi::OsStr;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Outcome of classifying a single filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Regular file, or a symlink to one. `size` is the length reported by stat.
    File { size: u64 },
    /// Directory, or a symlink to one.
    Directory,
    /// Anything that cannot become a File or Directory node.
    Error(EntryError),
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listed {
    pub path: PathBuf,
    /// The entry's base name. Lossy when the on-disk name is not valid UTF-8.
    pub name: String,
    /// Set when the name is not valid UTF-8; the entry must not be read.
    pub name_error: Option<EntryError>,
}

impl Listed {
    fn new(path: PathBuf, file_name: &OsStr) -> Self {
        match file_name.to_str() {
            Some(name) => Self {
                name: name.to_string(),
                path,
                name_error: None,
            },
            None => {
                let lossy = file_name.to_string_lossy().into_owned();
                Self {
                    name_error: Some(EntryError::new(
                        EntryErrorKind::InvalidUtf8Name,
                        format!("name {:?} is not valid UTF-8", lossy),
                    )),
                    name: lossy,
                    path,
                }
            }
        }
    }
}

/// Classify the entry at `path`, following a symlink one level.
pub fn classify(path: &Path) -> Classified {
    let link_meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) => return Classified::Error(EntryError::from_io(&e)),
    };

    if !link_meta.file_type().is_symlink() {
        return classify_metadata(&link_meta);
    }

    match fs::metadata(path) {
        Ok(target) => classify_metadata(&target),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            Classified::Error(EntryError::from_io(&e))
        }
        Err(e) => {
            let target = fs::read_link(path)
                .map(|t| t.display().to_string())
                .unwrap_or_else(|_| "<unreadable>".to_string());
            Classified::Error(EntryError::new(
                EntryErrorKind::BrokenSymlink,
                format!("target {} cannot be resolved: {}", target, e),
            ))
        }
    }
}

fn classify_metadata(meta: &Metadata) -> Classified {
    let file_type = meta.file_type();
    if file_type.is_file() {
        Classified::File { size: meta.len() }
    } else if file_type.is_dir() {
        Classified::Directory
    } else {
        Classified::Error(EntryError::new(
            EntryErrorKind::UnsupportedSpecialFile,
            format!("{} is not a regular file or directory", special_kind(meta)),
        ))
    }
}

#[cfg(unix)]
fn special_kind(meta: &Metadata) -> &'static str {
    use std::os::unix::fs::FileTypeExt;
    let ft = meta.file_type();
    if ft.is_fifo() {
        "named pipe"
    } else if ft.is_socket() {
        "socket"
    } else if ft.is_block_device() {
        "block device"
    } else if ft.is_char_device() {
        "character device"
    } else {
        "special file"
    }
}

#[cfg(not(unix))]
fn special_kind(_meta: &Metadata) -> &'static str {
    "special file"
}

/// List the immediate entries of `dir`, hidden entries included, sorted by name.
///
/// Fails only when the directory itself cannot be read; per-entry problems
/// are left for [`classify`] to report.
pub fn list_directory(dir: &Path) -> Result<Vec<Listed>, EntryError> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut listed = Vec::new();
    for item in walker {
        match item {
            Ok(entry) => listed.push(Listed::new(entry.path().to_path_buf(), entry.file_name())),
            Err(err) => match err.path() {
                Some(path) if path != dir => {
                    let name = path.file_name().unwrap_or_default().to_owned();
                    listed.push(Listed::new(path.to_path_buf(), &name));
                }
                _ => return Err(walk_error(&err)),
            },
        }
    }
    Ok(listed)
}

fn walk_error(err: &walkdir::Error) -> EntryError {
    if err.loop_ancestor().is_some() {
        return EntryError::new(EntryErrorKind::SymlinkLoop, err.to_string());
    }
    match err.io_error() {
        Some(io_err) => EntryError::from_io(io_err),
        None => EntryError::new(EntryErrorKind::IoFailure, err.to_string()),
    }
}

/// Open a regular file for hashing.
pub fn open_file(path: &Path) -> Result<File, EntryError> {
    File::open(path).map_err(|e| EntryError::from_io(&e))
}
