//! Project root detection.
//!
//! Given any path inside a project, walk ancestor directories toward the
//! filesystem root and return the first one carrying a project marker: an
//! Alire manifest, a GNAT project file, or a VCS root. Detection is pure
//! directory inspection with no network access, bounded by the
//! directory depth.

use std::path::{Path, PathBuf};

/// Find the project root for a file or directory path.
///
/// Falls back to the nearest directory of the input when no marker exists
/// anywhere above it.
pub fn find_project_root(path: &Path) -> PathBuf {
    let start = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(path)
    };

    for ancestor in start.ancestors() {
        if is_project_root(ancestor) {
            return ancestor.to_path_buf();
        }
    }
    start.to_path_buf()
}

/// Whether a directory carries a project marker.
fn is_project_root(dir: &Path) -> bool {
    if dir.join("alire.toml").is_file() {
        return true;
    }
    // .git may be a directory or, in worktrees, a file
    if dir.join(".git").exists() {
        return true;
    }
    has_gpr_file(dir)
}

fn has_gpr_file(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .any(|entry| entry.path().extension().is_some_and(|ext| ext == "gpr"))
}
