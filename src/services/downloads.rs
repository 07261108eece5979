//! Download task registry.
//!
//! [`DownloadManager`] owns the map of live tasks and a single event loop
//! that applies [`EngineEvent`]s to it. Tasks that reach `done` or `error`
//! are torn down and removed immediately, so a late poll sees "not found".

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::downloads::EVENT_CHANNEL_CAPACITY;
use crate::domain::events::NotificationEvent;
use crate::domain::{TaskId, TaskStatus, percent_from_fraction};
use crate::services::engine::{
    EngineError, EngineEvent, TaskEvents, TaskUpdate, TorrentEngine, TorrentSource,
};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to prepare download directory {path}: {message}")]
    Directory { path: String, message: String },
}

#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub id: TaskId,
    pub status: TaskStatus,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
}

impl DownloadTask {
    #[must_use]
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Initializing,
            progress: 0.0,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            progress: self.progress,
            status: self.status,
        }
    }
}

/// What a poll returns for a live task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub progress: f64,
    pub status: TaskStatus,
}

/// Outcome of applying one engine event to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Updated,
    Finished,
    Failed(String),
    Ignored,
}

/// The per-task state machine.
///
/// `initializing → downloading → done | error`. Progress never decreases,
/// and a task in a terminal state ignores everything.
pub fn apply_event(task: &mut DownloadTask, event: &EngineEvent) -> Transition {
    if task.status.is_terminal() {
        return Transition::Ignored;
    }

    match event {
        EngineEvent::MetadataResolved => {
            if task.status == TaskStatus::Initializing {
                task.status = TaskStatus::Downloading;
                Transition::Updated
            } else {
                Transition::Ignored
            }
        }
        EngineEvent::Progress(fraction) => {
            let percent = percent_from_fraction(*fraction);
            let mut changed = false;
            if task.status == TaskStatus::Initializing {
                task.status = TaskStatus::Downloading;
                changed = true;
            }
            if percent > task.progress {
                task.progress = percent;
                changed = true;
            }
            if changed {
                Transition::Updated
            } else {
                Transition::Ignored
            }
        }
        EngineEvent::Completed => {
            task.status = TaskStatus::Done;
            task.progress = 100.0;
            Transition::Finished
        }
        EngineEvent::Failed(reason) => {
            task.status = TaskStatus::Error;
            Transition::Failed(reason.clone())
        }
    }
}

/// Hands out task ids from the wall clock, strictly increasing.
#[derive(Debug, Default)]
struct TaskIdGenerator {
    last: AtomicI64,
}

impl TaskIdGenerator {
    fn next(&self) -> TaskId {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return TaskId::from_millis(candidate),
                Err(actual) => prev = actual,
            }
        }
    }
}

type TaskMap = Arc<RwLock<HashMap<TaskId, DownloadTask>>>;

pub struct DownloadManager {
    tasks: TaskMap,
    engine: Arc<dyn TorrentEngine>,
    events_tx: mpsc::Sender<TaskUpdate>,
    event_bus: broadcast::Sender<NotificationEvent>,
    ids: TaskIdGenerator,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl DownloadManager {
    /// Creates the manager and spawns its event loop on the current runtime.
    #[must_use]
    pub fn new(
        engine: Arc<dyn TorrentEngine>,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let tasks: TaskMap = Arc::new(RwLock::new(HashMap::new()));

        let event_loop = tokio::spawn(run_event_loop(
            events_rx,
            tasks.clone(),
            engine.clone(),
            event_bus.clone(),
        ));

        Self {
            tasks,
            engine,
            events_tx,
            event_bus,
            ids: TaskIdGenerator::default(),
            event_loop: Mutex::new(Some(event_loop)),
        }
    }

    /// Registers a new task and hands `source` to the engine.
    ///
    /// Returns as soon as the engine has accepted the torrent; resolution and
    /// transfer happen in the background.
    pub async fn start(
        &self,
        source: TorrentSource,
        save_dir: PathBuf,
    ) -> Result<TaskId, DownloadError> {
        tokio::fs::create_dir_all(&save_dir)
            .await
            .map_err(|e| DownloadError::Directory {
                path: save_dir.display().to_string(),
                message: e.to_string(),
            })?;

        let id = self.ids.next();
        self.tasks
            .write()
            .await
            .insert(id.clone(), DownloadTask::new(id.clone()));

        let events = TaskEvents::new(id.clone(), self.events_tx.clone());
        if let Err(e) = self.engine.start(&id, source, &save_dir, events).await {
            self.tasks.write().await.remove(&id);
            warn!(task_id = %id, error = %e, "Torrent engine refused download");
            return Err(e.into());
        }

        metrics::counter!("downloads_started_total").increment(1);
        let _ = self
            .event_bus
            .send(NotificationEvent::DownloadStarted { task_id: id.clone() });
        info!(task_id = %id, save_dir = %save_dir.display(), "Download started");

        Ok(id)
    }

    /// Current status of a live task, or `None` if it never existed or has
    /// already finished.
    pub async fn status(&self, id: &TaskId) -> Option<TaskSnapshot> {
        self.tasks.read().await.get(id).map(DownloadTask::snapshot)
    }

    pub async fn active_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Stops the event loop and tears down every task still registered.
    pub async fn shutdown(&self) {
        let handle = self
            .event_loop
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            handle.abort();
        }

        let ids: Vec<TaskId> = self.tasks.write().await.drain().map(|(id, _)| id).collect();
        for id in &ids {
            self.engine.stop(id).await;
        }

        if !ids.is_empty() {
            info!(count = ids.len(), "Abandoned in-flight downloads on shutdown");
        }
    }
}

async fn run_event_loop(
    mut rx: mpsc::Receiver<TaskUpdate>,
    tasks: TaskMap,
    engine: Arc<dyn TorrentEngine>,
    event_bus: broadcast::Sender<NotificationEvent>,
) {
    while let Some(TaskUpdate { task_id, event }) = rx.recv().await {
        let transition = {
            let mut tasks = tasks.write().await;
            let Some(task) = tasks.get_mut(&task_id) else {
                debug!(task_id = %task_id, ?event, "Event for unknown task ignored");
                continue;
            };
            let transition = apply_event(task, &event);

            // The outcome goes out while the task is still registered, so a
            // poller that gets the 404 can already have seen it.
            if let Some(notification) = notification_for(task, &transition) {
                let _ = event_bus.send(notification);
            }
            if task.status.is_terminal() {
                tasks.remove(&task_id);
            }
            transition
        };

        match transition {
            Transition::Finished => {
                metrics::counter!("downloads_finished_total", "outcome" => "done").increment(1);
                info!(task_id = %task_id, "Download finished");
                engine.stop(&task_id).await;
            }
            Transition::Failed(message) => {
                metrics::counter!("downloads_finished_total", "outcome" => "error").increment(1);
                warn!(task_id = %task_id, reason = %message, "Download failed");
                engine.stop(&task_id).await;
            }
            Transition::Updated | Transition::Ignored => {}
        }
    }
}

fn notification_for(task: &DownloadTask, transition: &Transition) -> Option<NotificationEvent> {
    let task_id = task.id.clone();
    match transition {
        Transition::Updated => Some(NotificationEvent::DownloadProgress {
            task_id,
            status: task.status,
            progress: task.progress,
        }),
        Transition::Finished => Some(NotificationEvent::DownloadFinished { task_id }),
        Transition::Failed(message) => Some(NotificationEvent::DownloadFailed {
            task_id,
            message: message.clone(),
        }),
        Transition::Ignored => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> DownloadTask {
        DownloadTask::new(TaskId::from("1"))
    }

    #[test]
    fn test_metadata_moves_to_downloading() {
        let mut t = task();
        assert_eq!(apply_event(&mut t, &EngineEvent::MetadataResolved), Transition::Updated);
        assert_eq!(t.status, TaskStatus::Downloading);
        assert_eq!(
            apply_event(&mut t, &EngineEvent::MetadataResolved),
            Transition::Ignored
        );
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut t = task();
        apply_event(&mut t, &EngineEvent::Progress(0.5));
        assert!((t.progress - 50.0).abs() < f64::EPSILON);
        assert_eq!(apply_event(&mut t, &EngineEvent::Progress(0.3)), Transition::Ignored);
        assert!((t.progress - 50.0).abs() < f64::EPSILON);
        apply_event(&mut t, &EngineEvent::Progress(0.654));
        assert!((t.progress - 65.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_implies_downloading() {
        let mut t = task();
        apply_event(&mut t, &EngineEvent::Progress(0.0));
        assert_eq!(t.status, TaskStatus::Downloading);
    }

    #[test]
    fn test_completion_forces_full_progress() {
        let mut t = task();
        apply_event(&mut t, &EngineEvent::Progress(0.2));
        assert_eq!(apply_event(&mut t, &EngineEvent::Completed), Transition::Finished);
        assert_eq!(t.status, TaskStatus::Done);
        assert!((t.progress - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_terminal_state_ignores_events() {
        let mut t = task();
        assert_eq!(
            apply_event(&mut t, &EngineEvent::Failed("tracker down".into())),
            Transition::Failed("tracker down".into())
        );
        assert_eq!(t.status, TaskStatus::Error);
        assert_eq!(apply_event(&mut t, &EngineEvent::Progress(0.9)), Transition::Ignored);
        assert_eq!(apply_event(&mut t, &EngineEvent::Completed), Transition::Ignored);
        assert_eq!(t.status, TaskStatus::Error);
    }

    #[test]
    fn test_task_ids_are_strictly_increasing() {
        let ids = TaskIdGenerator::default();
        let mut previous: i64 = ids.next().as_str().parse().unwrap();
        for _ in 0..100 {
            let next: i64 = ids.next().as_str().parse().unwrap();
            assert!(next > previous);
            previous = next;
        }
    }
}
