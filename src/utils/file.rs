//! File utilities for ingestion.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// File name used as a document's `source_id`.
pub fn source_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

/// List regular files directly inside `dir`, sorted by file name.
///
/// Returns `None` when the directory does not exist.
pub fn list_files(dir: &Path) -> Option<std::io::Result<Vec<PathBuf>>> {
    if !dir.is_dir() {
        return None;
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e.into())),
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Some(Ok(files))
}
