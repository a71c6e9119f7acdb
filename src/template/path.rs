//! File lookup along a template search path

use std::path::{Path, PathBuf};

/// Find the first directory in `search_paths` containing a regular file `name`
///
/// Missing or unreadable directories are treated as "not found".
pub fn find_file<P: AsRef<Path>>(search_paths: &[P], name: &str) -> Option<PathBuf> {
    search_paths
        .iter()
        .map(|dir| dir.as_ref().join(name))
        .find(|candidate| candidate.is_file())
}
