//! Working-directory snapshot enumeration.
//!
//! The exclusion and binary checks are pure predicates over relative paths so
//! they can be tested without touching the filesystem.

use super::models::BlobEncoding;
use base64::Engine;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Path is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),

    #[error("File {0} is classified as text but is not valid UTF-8")]
    NonUtf8Content(String),
}

/// Path components that are never synced: VCS metadata, dependency caches,
/// build output, local tooling state.
const EXCLUDED_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    ".cache",
    ".config",
    ".DS_Store",
];

/// Exact file names excluded wherever they appear.
const EXCLUDED_FILES: &[&str] = &[".env", ".env.local"];

/// Excluded by suffix match on the file name.
const EXCLUDED_SUFFIXES: &[&str] = &[".log"];

/// Extensions treated as binary and uploaded base64-encoded.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "pdf", "zip", "tar", "gz", "woff", "woff2", "ttf", "eot",
];

/// Whether a relative path is excluded from the snapshot.
pub fn is_excluded(rel_path: &str) -> bool {
    for part in rel_path.split('/') {
        if EXCLUDED_NAMES.contains(&part) || EXCLUDED_FILES.contains(&part) {
            return true;
        }
    }
    EXCLUDED_SUFFIXES
        .iter()
        .any(|suffix| rel_path.ends_with(suffix))
}

/// Whether a path should be uploaded as a base64 blob, by extension.
pub fn is_binary_path(rel_path: &str) -> bool {
    let lowered = rel_path.to_lowercase();
    BINARY_EXTENSIONS
        .iter()
        .any(|ext| lowered.ends_with(&format!(".{}", ext)))
}

/// Content of one snapshot file, ready to become a blob.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub content: String,
    pub encoding: BlobEncoding,
}

/// Read a file and encode it according to its classification.
pub fn read_file_content(abs_path: &Path, rel_path: &str) -> Result<FileContent, SnapshotError> {
    let bytes = std::fs::read(abs_path)?;

    if is_binary_path(rel_path) {
        Ok(FileContent {
            content: base64::engine::general_purpose::STANDARD.encode(&bytes),
            encoding: BlobEncoding::Base64,
        })
    } else {
        let content = String::from_utf8(bytes)
            .map_err(|_| SnapshotError::NonUtf8Content(rel_path.to_string()))?;
        Ok(FileContent {
            content,
            encoding: BlobEncoding::Utf8,
        })
    }
}

/// Enumerate all files under `root` that pass the exclusion predicate.
///
/// Returns relative paths with `/` separators, in deterministic sorted order.
pub fn collect_files(root: &Path) -> Result<Vec<String>, SnapshotError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        // Prune excluded directories early; the root itself always passes.
        if entry.depth() == 0 {
            return true;
        }
        match relative_path(root, entry.path()) {
            Ok(rel) => !is_excluded(&rel),
            Err(_) => true, // surfaced below when the entry is visited
        }
    });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative_path(root, entry.path())?;
        if is_excluded(&rel) {
            continue;
        }
        files.push(rel);
    }

    files.sort();
    Ok(files)
}

fn relative_path(root: &Path, path: &Path) -> Result<String, SnapshotError> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| SnapshotError::NonUtf8Path(rel.to_path_buf()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}
