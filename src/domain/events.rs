//! Notification events broadcast to connected clients via SSE.

use serde::Serialize;

use super::{TaskId, TaskStatus};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    DownloadStarted {
        task_id: TaskId,
    },
    DownloadProgress {
        task_id: TaskId,
        status: TaskStatus,
        progress: f64,
    },
    DownloadFinished {
        task_id: TaskId,
    },
    DownloadFailed {
        task_id: TaskId,
        message: String,
    },

    FileRenamed {
        old_path: String,
        new_path: String,
    },

    SettingsUpdated {
        media_root: String,
    },
}
