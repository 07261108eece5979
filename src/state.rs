use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::warn;

use crate::clients::QBitEngine;
use crate::config::Config;
use crate::domain::events::NotificationEvent;
use crate::services::{DownloadManager, SettingsStore, TorrentEngine};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub settings: SettingsStore,

    pub downloads: Arc<DownloadManager>,

    pub event_bus: broadcast::Sender<NotificationEvent>,
}

impl SharedState {
    /// Builds the state with the qBittorrent-backed torrent engine.
    ///
    /// `config_path` is where settings saves are written.
    pub async fn new(config: Config, config_path: PathBuf) -> anyhow::Result<Self> {
        let engine = Arc::new(QBitEngine::new(&config.qbittorrent)?);
        if !engine.is_available().await {
            warn!(
                url = %config.qbittorrent.url,
                "qBittorrent is not reachable; downloads will fail until it is"
            );
        }
        Ok(Self::with_engine(config, config_path, engine))
    }

    /// Builds the state around an arbitrary engine. Must be called inside a
    /// tokio runtime since it spawns the download event loop.
    #[must_use]
    pub fn with_engine(
        config: Config,
        config_path: PathBuf,
        engine: Arc<dyn TorrentEngine>,
    ) -> Self {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size.max(1));
        let config = Arc::new(RwLock::new(config));
        let settings = SettingsStore::new(config.clone(), config_path);
        let downloads = Arc::new(DownloadManager::new(engine, event_bus.clone()));

        Self {
            config,
            settings,
            downloads,
            event_bus,
        }
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn shutdown(&self) {
        self.downloads.shutdown().await;
    }
}
