//! Path canonicalization and subpath normalization utilities

use std::io;
use std::path::{Component, Path, PathBuf};

/// Canonicalize a path (resolve symlinks, `..`, `.`) and strip trailing separators.
///
/// Used for the recorded root path of a tree and for detecting directory
/// symlinks that lead back to one of their ancestors.
pub fn canonicalize_path(path: &Path) -> io::Result<PathBuf> {
    // dunce avoids UNC prefixes on Windows
    let canonical = dunce::canonicalize(path)?;
    Ok(PathBuf::from(normalize_path_string(&canonical.to_string_lossy())))
}

/// Remove trailing slashes (except for the root itself).
pub fn normalize_path_string(path: &str) -> String {
    let mut result = path.to_string();
    if result.len() > 1 {
        while result.ends_with('/') || result.ends_with('\\') {
            result.pop();
        }
    }
    result
}

/// Split a subpath into child-name segments relative to a tree rooted at `root`.
///
/// `""` and `"."` address the root. An absolute subpath must lie under `root`
/// and is made relative first. `..` pops lexically and never escapes the
/// root. Returns `None` for absolute paths outside `root`.
pub fn subpath_segments(root: &Path, subpath: &Path) -> Option<Vec<String>> {
    let relative = if subpath.is_absolute() {
        subpath.strip_prefix(root).ok()?
    } else {
        subpath
    };

    let mut segments: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                segments.pop();
            }
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(segments)
}
