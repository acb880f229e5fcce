// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Normalize a relative path string for glob matching: forward slashes, no
/// leading `./` or `/`.
pub fn normalize_rel(rel: &str) -> String {
    let mut s = rel.replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    s.trim_start_matches('/').to_string()
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Relative paths are assumed to be relative to `root` already. Absolute
/// paths are stripped of `root`; if that fails (e.g. symlinked temp dirs on
/// macOS), both sides are canonicalized and we try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if path.is_relative() {
        return Some(normalize_rel(&to_slash(path)));
    }

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    // Deleted files can no longer be canonicalized; try via the parent.
    if let (Ok(root_canon), Some(parent), Some(name)) =
        (root.canonicalize(), path.parent(), path.file_name())
    {
        if let Ok(parent_canon) = parent.canonicalize() {
            if let Ok(rel) = parent_canon.join(name).strip_prefix(&root_canon) {
                return Some(to_slash(rel));
            }
        }
    }

    None
}
