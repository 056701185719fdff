//! File identity normalization.

use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Normalize `path` into the identity used by the graph and cache.
///
/// Relative paths are joined onto the current working directory and the
/// result is lexically cleaned (`.` and `..` segments resolved). Symlinks are
/// not followed and the file does not need to exist, since watcher events for
/// removed files must still map onto the same node.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path.clean();
    }

    match std::env::current_dir() {
        Ok(cwd) => normalize_path_from(path, &cwd),
        Err(_) => path.clean(),
    }
}

/// Normalize `path` against an explicit base directory.
pub fn normalize_path_from(path: impl AsRef<Path>, base: &Path) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.clean()
    } else {
        base.join(path).clean()
    }
}
