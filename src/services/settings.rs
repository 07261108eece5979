//! Media-root settings backed by the shared [`Config`].
//!
//! Handlers read the media root through [`SettingsStore`] on every request,
//! so a save takes effect immediately without a restart.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Directory does not exist: {0}")]
    MissingDirectory(String),

    #[error("Failed to persist settings: {0}")]
    Persist(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub media_root: String,
}

#[derive(Clone)]
pub struct SettingsStore {
    config: Arc<RwLock<Config>>,
    path: PathBuf,
}

impl SettingsStore {
    /// `path` is the config file that saves are written back to.
    #[must_use]
    pub const fn new(config: Arc<RwLock<Config>>, path: PathBuf) -> Self {
        Self { config, path }
    }

    pub async fn settings(&self) -> Settings {
        Settings {
            media_root: self.config.read().await.library.media_root.clone(),
        }
    }

    pub async fn media_root(&self) -> PathBuf {
        PathBuf::from(&self.config.read().await.library.media_root)
    }

    pub async fn download_dir(&self) -> PathBuf {
        self.config.read().await.library.download_path()
    }

    /// Replaces the media root and writes the whole config back to disk.
    ///
    /// The in-memory value only changes once the file has been written.
    pub async fn update_media_root(&self, media_root: &str) -> Result<(), SettingsError> {
        let is_dir = tokio::fs::metadata(media_root)
            .await
            .is_ok_and(|m| m.is_dir());
        if !is_dir {
            return Err(SettingsError::MissingDirectory(media_root.to_string()));
        }

        let mut config = self.config.write().await;
        let mut updated = config.clone();
        updated.library.media_root = media_root.to_string();

        let path = self.path.clone();
        let to_save = updated.clone();
        tokio::task::spawn_blocking(move || to_save.save_to_path(&path))
            .await
            .map_err(|e| SettingsError::Persist(e.to_string()))?
            .map_err(|e| SettingsError::Persist(format!("{e:#}")))?;

        *config = updated;
        info!(media_root = %media_root, "Media root updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_for(dir: &std::path::Path) -> (SettingsStore, PathBuf) {
        let config_path = dir.join("config.toml");
        let mut config = Config::default();
        config.library.media_root = dir.display().to_string();
        let store = SettingsStore::new(Arc::new(RwLock::new(config)), config_path.clone());
        (store, config_path)
    }

    #[tokio::test]
    async fn test_update_media_root_persists() {
        let dir = tempfile::tempdir().unwrap();
        let new_root = dir.path().join("library");
        std::fs::create_dir(&new_root).unwrap();
        let (store, config_path) = store_for(dir.path());

        store
            .update_media_root(new_root.to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(store.media_root().await, new_root);
        assert_eq!(store.download_dir().await, new_root.join("downloads"));
        let saved = Config::load_from_path(&config_path).unwrap();
        assert_eq!(saved.library.media_root, new_root.display().to_string());
    }

    #[tokio::test]
    async fn test_update_media_root_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (store, config_path) = store_for(dir.path());
        let before = store.settings().await;

        let err = store
            .update_media_root(dir.path().join("missing").to_str().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, SettingsError::MissingDirectory(_)));
        assert_eq!(store.settings().await, before);
        assert!(!config_path.exists());
    }

    #[tokio::test]
    async fn test_update_media_root_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        let (store, _) = store_for(dir.path());

        let err = store
            .update_media_root(file.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::MissingDirectory(_)));
    }
}
