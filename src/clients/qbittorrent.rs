use anyhow::{Context, Result, bail};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::QBittorrentConfig;

#[derive(Debug, Clone)]
pub struct QBitConfig {
    pub base_url: String,

    pub username: String,

    pub password: String,
}

impl From<&QBittorrentConfig> for QBitConfig {
    fn from(config: &QBittorrentConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

/// The `state` strings qBittorrent reports that the engine acts on. Everything
/// else is a transfer that is still in progress.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TorrentState {
    Error,
    MissingFiles,
    MetaDL,
    ForcedMetaDL,
    Downloading,
    StalledDL,
    QueuedDL,
    Uploading,
    PausedUP,
    QueuedUP,
    StalledUP,
    ForcedUP,
    StoppedUP,
    #[serde(other)]
    Other,
}

impl TorrentState {
    /// Still fetching the info dictionary for a magnet link.
    #[must_use]
    pub const fn is_fetching_metadata(self) -> bool {
        matches!(self, Self::MetaDL | Self::ForcedMetaDL)
    }

    /// Payload is complete and the torrent is seeding or parked after seeding.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(
            self,
            Self::Uploading
                | Self::PausedUP
                | Self::QueuedUP
                | Self::StalledUP
                | Self::ForcedUP
                | Self::StoppedUP
        )
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::MissingFiles)
    }
}

/// One entry of `/api/v2/torrents/info`, reduced to what progress tracking needs.
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    pub hash: String,
    pub state: TorrentState,
    pub progress: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AddTorrentOptions {
    pub save_path: Option<String>,

    pub category: Option<String>,

    pub tags: Option<String>,
}

impl AddTorrentOptions {
    fn apply(self, mut form: Form) -> Form {
        if let Some(path) = self.save_path {
            form = form.text("savepath", path);
        }
        if let Some(cat) = self.category {
            form = form.text("category", cat);
        }
        if let Some(tags) = self.tags {
            form = form.text("tags", tags);
        }
        form
    }
}

#[derive(Debug, Clone)]
pub struct QBitClient {
    client: Client,
    config: QBitConfig,
}

impl QBitClient {
    pub fn new(config: QBitConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("mediabox/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build qBittorrent HTTP client")?;

        Ok(Self { client, config })
    }

    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/api/v2/auth/login", self.config.base_url);

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .header("Referer", &self.config.base_url)
            .form(&params)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && body.contains("Ok") {
            debug!("Successfully authenticated with qBittorrent");
            Ok(())
        } else if body.contains("Fails") {
            bail!("qBittorrent authentication failed: invalid credentials")
        } else {
            bail!("qBittorrent authentication failed: status={status}, body={body}")
        }
    }

    async fn ensure_auth(&self) -> Result<()> {
        let url = format!("{}/api/v2/app/version", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.base_url)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!(reason = "session_expired", "Logging in...");
            self.login().await?;
        }

        Ok(())
    }

    pub async fn get_version(&self) -> Result<String> {
        self.ensure_auth().await?;

        let url = format!("{}/api/v2/app/version", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.base_url)
            .send()
            .await?;

        let version = response.text().await?;
        Ok(version)
    }

    /// Adds a torrent by magnet or HTTP link.
    pub async fn add_torrent_url(&self, url: &str, options: AddTorrentOptions) -> Result<()> {
        let form = options.apply(Form::new().text("urls", url.to_string()));
        self.add_torrent(form).await
    }

    /// Adds a torrent from the contents of a `.torrent` file.
    pub async fn add_torrent_file(&self, bytes: Vec<u8>, options: AddTorrentOptions) -> Result<()> {
        let part = Part::bytes(bytes)
            .file_name("upload.torrent")
            .mime_str("application/x-bittorrent")?;
        let form = options.apply(Form::new().part("torrents", part));
        self.add_torrent(form).await
    }

    async fn add_torrent(&self, form: Form) -> Result<()> {
        self.ensure_auth().await?;

        let api_url = format!("{}/api/v2/torrents/add", self.config.base_url);
        let response = self
            .client
            .post(&api_url)
            .header("Referer", &self.config.base_url)
            .multipart(form)
            .send()
            .await
            .context("Failed to add torrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && !body.contains("Fails") {
            debug!("Torrent added successfully");
            Ok(())
        } else if status == StatusCode::UNSUPPORTED_MEDIA_TYPE || body.contains("Fails") {
            bail!("Torrent is not valid")
        } else {
            bail!("Failed to add torrent: status={status}, body={body}")
        }
    }

    /// Torrents carrying `tag`. Each download is tagged uniquely, so this is
    /// normally zero or one entry.
    pub async fn get_torrents_by_tag(&self, tag: &str) -> Result<Vec<TorrentInfo>> {
        self.ensure_auth().await?;

        let mut url = Url::parse(&format!("{}/api/v2/torrents/info", self.config.base_url))?;
        url.query_pairs_mut().append_pair("tag", tag);

        let response = self
            .client
            .get(url)
            .header("Referer", &self.config.base_url)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            let truncated: String = text.chars().take(1000).collect();
            debug!(error = %e, response = %truncated, "Failed to parse qBittorrent response");
            anyhow::anyhow!("Failed to parse torrent list: {e}")
        })
    }

    pub async fn delete_torrent(&self, hash: &str, delete_files: bool) -> Result<()> {
        self.ensure_auth().await?;

        let url = format!("{}/api/v2/torrents/delete", self.config.base_url);
        let params = [
            ("hashes", hash),
            ("deleteFiles", if delete_files { "true" } else { "false" }),
        ];

        self.client
            .post(&url)
            .header("Referer", &self.config.base_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?;

        info!(hash = %hash, "Removed torrent from qBittorrent");
        Ok(())
    }

    pub async fn is_available(&self) -> bool {
        match self.get_version().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "qBittorrent not available");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torrent_state_checks() {
        assert!(TorrentState::MetaDL.is_fetching_metadata());
        assert!(!TorrentState::Downloading.is_fetching_metadata());

        assert!(TorrentState::Uploading.is_completed());
        assert!(TorrentState::StalledUP.is_completed());
        assert!(!TorrentState::Downloading.is_completed());

        assert!(TorrentState::Error.is_error());
        assert!(TorrentState::MissingFiles.is_error());
        assert!(!TorrentState::Downloading.is_error());
    }

    #[test]
    fn test_state_names_match_web_api() {
        let parse = |s: &str| serde_json::from_str::<TorrentState>(&format!("\"{s}\"")).unwrap();
        assert_eq!(parse("metaDL"), TorrentState::MetaDL);
        assert_eq!(parse("forcedMetaDL"), TorrentState::ForcedMetaDL);
        assert_eq!(parse("stalledDL"), TorrentState::StalledDL);
        assert_eq!(parse("pausedUP"), TorrentState::PausedUP);
        assert_eq!(parse("stoppedUP"), TorrentState::StoppedUP);
        assert_eq!(parse("missingFiles"), TorrentState::MissingFiles);
        assert_eq!(parse("checkingResumeData"), TorrentState::Other);
    }

    #[test]
    fn test_torrent_info_ignores_extra_fields() {
        let json = r#"[{"hash":"abc","name":"x","size":12,"state":"metaDL","progress":0}]"#;
        let torrents: Vec<TorrentInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(torrents[0].hash, "abc");
        assert_eq!(torrents[0].state, TorrentState::MetaDL);
    }

    #[test]
    fn test_config_conversion_trims_trailing_slash() {
        let mut config = QBittorrentConfig::default();
        config.url = "http://nas:8080/".to_string();
        let qbit = QBitConfig::from(&config);
        assert_eq!(qbit.base_url, "http://nas:8080");
        assert_eq!(qbit.username, "admin");
    }
}
