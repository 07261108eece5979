//! Filesystem operations over the media root.
//!
//! Every path accepted here is relative to the configured media root. Paths
//! are joined onto the root as given: a leading `/` is ignored, but `..`
//! segments are not rejected.

pub mod media;
pub mod rename;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::DirEntry;
use tracing::debug;

use crate::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::domain::{EntryKind, FileItem};

pub use media::{MediaFile, content_type_for, read_media};
pub use rename::rename_entry;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Target already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl LibraryError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Normalizes a client-supplied relative path to `a/b/c` form.
///
/// Empty segments and `.` are dropped; backslashes count as separators.
#[must_use]
pub fn normalize_relative(rel: &str) -> String {
    rel.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Joins a root-relative path onto `root`.
#[must_use]
pub fn resolve(root: &Path, rel: &str) -> PathBuf {
    let rel = normalize_relative(rel);
    if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

/// Joins a normalized parent and a child name into a root-relative path.
#[must_use]
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn lowercase_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

#[must_use]
pub fn is_image_name(name: &str) -> bool {
    lowercase_extension(name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[must_use]
pub fn is_video_name(name: &str) -> bool {
    lowercase_extension(name).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Lists the immediate children of `dir` (root-relative).
///
/// Entries are stat'ed concurrently and returned in the order the
/// filesystem enumerates them. Any failure aborts the whole listing.
pub async fn list_directory(root: &Path, dir: &str) -> Result<Vec<FileItem>, LibraryError> {
    let rel_dir = normalize_relative(dir);
    let full_path = resolve(root, &rel_dir);

    let mut reader = tokio::fs::read_dir(&full_path)
        .await
        .map_err(|e| LibraryError::io(&full_path, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| LibraryError::io(&full_path, e))?
    {
        entries.push(entry);
    }

    let items = try_join_all(entries.into_iter().map(|entry| describe_entry(&rel_dir, entry))).await?;

    debug!(path = %full_path.display(), count = items.len(), "Listed directory");
    Ok(items)
}

async fn describe_entry(rel_dir: &str, entry: DirEntry) -> Result<FileItem, LibraryError> {
    let entry_path = entry.path();
    let name = entry.file_name().to_string_lossy().to_string();

    let file_type = entry
        .file_type()
        .await
        .map_err(|e| LibraryError::io(&entry_path, e))?;
    let metadata = tokio::fs::metadata(&entry_path)
        .await
        .map_err(|e| LibraryError::io(&entry_path, e))?;
    let modified = metadata
        .modified()
        .map_err(|e| LibraryError::io(&entry_path, e))?;

    let is_file = file_type.is_file();
    let kind = if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    let rel_path = join_relative(rel_dir, &name);

    Ok(FileItem {
        id: rel_path.clone(),
        is_image: is_file && is_image_name(&name),
        is_video: is_file && is_video_name(&name),
        name,
        kind,
        path: rel_path,
        size: metadata.len(),
        modified_at: DateTime::<Utc>::from(modified),
    })
}
