//! [`TorrentEngine`] backed by a qBittorrent Web API instance.
//!
//! Each task is tagged `mediabox-<task id>` in qBittorrent. A watcher polls
//! the tagged torrent and translates what it sees into engine events.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clients::qbittorrent::{AddTorrentOptions, QBitClient, QBitConfig, TorrentState};
use crate::config::QBittorrentConfig;
use crate::constants::downloads::TAG_PREFIX;
use crate::domain::TaskId;
use crate::services::engine::{
    EngineError, EngineEvent, TaskEvents, TorrentEngine, TorrentSource,
};

/// Polls without the torrent showing up before the task is failed.
const MISSING_POLL_LIMIT: u32 = 30;

#[must_use]
pub fn task_tag(task_id: &TaskId) -> String {
    format!("{TAG_PREFIX}{task_id}")
}

/// Tracks what has already been reported for one torrent.
#[derive(Debug, Default)]
pub struct WatchState {
    resolved: bool,
    last_progress: Option<f64>,
    missing_polls: u32,
}

impl WatchState {
    /// Events implied by one poll result. A terminal event is always last.
    pub fn observe(&mut self, state: TorrentState, progress: f64) -> Vec<EngineEvent> {
        self.missing_polls = 0;

        if state.is_error() {
            let reason = match state {
                TorrentState::MissingFiles => "qBittorrent reports missing files",
                _ => "qBittorrent reports an error",
            };
            return vec![EngineEvent::Failed(reason.to_string())];
        }
        if state.is_fetching_metadata() {
            return Vec::new();
        }

        let mut events = Vec::new();
        if !self.resolved {
            self.resolved = true;
            events.push(EngineEvent::MetadataResolved);
        }
        if self.last_progress.is_none_or(|last| progress > last) {
            self.last_progress = Some(progress);
            events.push(EngineEvent::Progress(progress));
        }
        if state.is_completed() || progress >= 1.0 {
            events.push(EngineEvent::Completed);
        }
        events
    }

    /// Records a poll where the torrent was absent. Returns the failure to
    /// report once the limit is reached.
    pub fn observe_missing(&mut self) -> Option<EngineEvent> {
        self.missing_polls += 1;
        (self.missing_polls >= MISSING_POLL_LIMIT)
            .then(|| EngineEvent::Failed("torrent is no longer known to qBittorrent".to_string()))
    }
}

pub struct QBitEngine {
    client: Arc<QBitClient>,
    category: String,
    poll_interval: Duration,
    watchers: Mutex<HashMap<TaskId, JoinHandle<()>>>,
}

impl QBitEngine {
    pub fn new(config: &QBittorrentConfig) -> anyhow::Result<Self> {
        let client = QBitClient::new(QBitConfig::from(config))?;
        Ok(Self {
            client: Arc::new(client),
            category: config.category.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            watchers: Mutex::new(HashMap::new()),
        })
    }

    pub async fn is_available(&self) -> bool {
        self.client.is_available().await
    }
}

#[async_trait::async_trait]
impl TorrentEngine for QBitEngine {
    async fn start(
        &self,
        task_id: &TaskId,
        source: TorrentSource,
        save_dir: &Path,
        events: TaskEvents,
    ) -> Result<(), EngineError> {
        let tag = task_tag(task_id);
        let options = AddTorrentOptions {
            save_path: Some(save_dir.display().to_string()),
            category: (!self.category.is_empty()).then(|| self.category.clone()),
            tags: Some(tag.clone()),
        };

        let added = match source {
            TorrentSource::Url(url) => self.client.add_torrent_url(&url, options).await,
            TorrentSource::File(bytes) => self.client.add_torrent_file(bytes, options).await,
        };
        added.map_err(engine_error)?;

        let handle = tokio::spawn(watch_torrent(
            self.client.clone(),
            tag,
            self.poll_interval,
            events,
        ));
        self.watchers.lock().await.insert(task_id.clone(), handle);
        Ok(())
    }

    async fn stop(&self, task_id: &TaskId) {
        if let Some(handle) = self.watchers.lock().await.remove(task_id) {
            handle.abort();
        }

        let tag = task_tag(task_id);
        match self.client.get_torrents_by_tag(&tag).await {
            Ok(torrents) => {
                for torrent in torrents {
                    if let Err(e) = self.client.delete_torrent(&torrent.hash, false).await {
                        warn!(task_id = %task_id, error = %e, "Failed to remove torrent");
                    }
                }
            }
            Err(e) => warn!(task_id = %task_id, error = %e, "Failed to look up torrent for removal"),
        }
    }
}

fn engine_error(err: anyhow::Error) -> EngineError {
    let unreachable = err
        .downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_connect() || e.is_timeout());
    if unreachable {
        EngineError::Unavailable(format!("{err:#}"))
    } else {
        EngineError::Rejected(format!("{err:#}"))
    }
}

async fn watch_torrent(
    client: Arc<QBitClient>,
    tag: String,
    poll_interval: Duration,
    events: TaskEvents,
) {
    let mut interval = tokio::time::interval(poll_interval);
    let mut state = WatchState::default();

    loop {
        interval.tick().await;

        let torrents = match client.get_torrents_by_tag(&tag).await {
            Ok(torrents) => torrents,
            Err(e) => {
                debug!(tag = %tag, error = %e, "Progress poll failed");
                continue;
            }
        };

        let observed = match torrents.first() {
            Some(torrent) => state.observe(torrent.state, torrent.progress),
            None => state.observe_missing().into_iter().collect(),
        };

        for event in observed {
            let terminal = matches!(event, EngineEvent::Completed | EngineEvent::Failed(_));
            if !events.send(event).await || terminal {
                return;
            }
        }
    }
}
