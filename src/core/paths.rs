//! Path conversions between repository-relative backend output and absolute record keys.
//!
//! Backend output always uses `/` separators relative to the repository root (lock
//! listings may use `\` on Windows, where it is never part of a filename). Canonical state records are keyed by absolute,
//! lexically normalised paths so the same file reached through different spellings
//! maps to one record.

use path_slash::PathExt as _;
use std::path::{Component, Path, PathBuf};

/// Lexically normalise a path: drop `.` components and resolve `..` against preceding
/// components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Convert a backend-reported path (relative to `repo_root`) into an absolute path
pub fn absolute_path(repo_root: &Path, relative: &str) -> PathBuf {
    #[cfg(windows)]
    let relative = relative.replace('\\', "/");
    normalize(&repo_root.join(relative))
}

/// Convert filenames relative to the repository root to absolute paths
pub fn absolute_filenames(files: &[String], repo_root: &Path) -> Vec<PathBuf> {
    files
        .iter()
        .map(|file| absolute_path(repo_root, file))
        .collect()
}

/// Convert absolute paths to repository-relative `/`-separated strings.
///
/// Paths outside of `repo_root` are dropped.
pub fn relative_filenames(files: &[PathBuf], repo_root: &Path) -> Vec<String> {
    let root = normalize(repo_root);
    files
        .iter()
        .filter_map(|file| {
            let file = normalize(file);
            file.strip_prefix(&root)
                .ok()
                .map(|rel| rel.to_slash_lossy().into_owned())
        })
        .collect()
}

/// String form handed to the backend as a file argument
pub fn to_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
