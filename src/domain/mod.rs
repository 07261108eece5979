//! Domain types shared by the library, download and HTTP layers.
//!
//! Identifiers follow the Newtype pattern so a task id can never be confused
//! with a root-relative path.

pub mod events;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a listed entry is a directory or anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed directory, derived from a single stat call.
///
/// `path` is relative to the media root (always `/`-separated) and doubles
/// as the item's `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub is_image: bool,
    pub is_video: bool,
}

impl FileItem {
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }
}

/// Identifier of a download task, derived from its creation time in
/// milliseconds.
///
/// # Examples
///
/// ```rust
/// use mediabox::domain::TaskId;
///
/// let id = TaskId::from_millis(1_700_000_000_000);
/// assert_eq!(id.as_str(), "1700000000000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle label of a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Initializing,
    Downloading,
    Done,
    Error,
}

impl TaskStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Converts an engine fraction (0.0–1.0) to a percentage with one decimal.
///
/// Out-of-range and non-finite inputs are clamped.
#[must_use]
pub fn percent_from_fraction(fraction: f64) -> f64 {
    if !fraction.is_finite() {
        return 0.0;
    }
    let percent = (fraction * 100.0).clamp(0.0, 100.0);
    (percent * 10.0).round() / 10.0
}
