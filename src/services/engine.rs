//! Boundary between the download manager and the torrent engine.
//!
//! The engine never touches the task registry. It reports what happens to a
//! torrent by sending [`EngineEvent`]s through the [`TaskEvents`] sink it was
//! given at start, and the manager turns those into state transitions.

use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::TaskId;

/// What to download: a magnet/HTTP link or the raw bytes of a `.torrent` file.
#[derive(Clone)]
pub enum TorrentSource {
    Url(String),
    File(Vec<u8>),
}

impl fmt::Debug for TorrentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::File(bytes) => write!(f, "File({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Torrent metadata is known and the payload transfer has begun.
    MetadataResolved,
    /// Fraction of the payload downloaded so far, 0.0–1.0.
    Progress(f64),
    Completed,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TaskUpdate {
    pub task_id: TaskId,
    pub event: EngineEvent,
}

/// Per-task handle the engine uses to report progress.
#[derive(Debug, Clone)]
pub struct TaskEvents {
    task_id: TaskId,
    tx: mpsc::Sender<TaskUpdate>,
}

impl TaskEvents {
    #[must_use]
    pub const fn new(task_id: TaskId, tx: mpsc::Sender<TaskUpdate>) -> Self {
        Self { task_id, tx }
    }

    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Sends an event. Returns `false` once the manager has gone away.
    pub async fn send(&self, event: EngineEvent) -> bool {
        self.tx
            .send(TaskUpdate {
                task_id: self.task_id.clone(),
                event,
            })
            .await
            .is_ok()
    }

    pub async fn metadata_resolved(&self) -> bool {
        self.send(EngineEvent::MetadataResolved).await
    }

    pub async fn progress(&self, fraction: f64) -> bool {
        self.send(EngineEvent::Progress(fraction)).await
    }

    pub async fn completed(&self) -> bool {
        self.send(EngineEvent::Completed).await
    }

    pub async fn failed(&self, reason: impl Into<String>) -> bool {
        self.send(EngineEvent::Failed(reason.into())).await
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Torrent rejected: {0}")]
    Rejected(String),

    #[error("Torrent engine unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait TorrentEngine: Send + Sync {
    /// Hands a torrent to the engine. Must return as soon as the engine has
    /// accepted it; the transfer itself is reported through `events`.
    async fn start(
        &self,
        task_id: &TaskId,
        source: TorrentSource,
        save_dir: &Path,
        events: TaskEvents,
    ) -> Result<(), EngineError>;

    /// Tears down everything the engine holds for `task_id`. Downloaded
    /// files are kept.
    async fn stop(&self, task_id: &TaskId);
}
