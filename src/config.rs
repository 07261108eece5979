use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub library: LibraryConfig,

    pub qbittorrent: QBittorrentConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
            event_bus_buffer_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub bind_address: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory whose contents are listed and served.
    pub media_root: String,

    /// Sub-directory of `media_root` that receives torrent downloads.
    pub downloads_dir: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            media_root: "./media".to_string(),
            downloads_dir: "downloads".to_string(),
        }
    }
}

impl LibraryConfig {
    #[must_use]
    pub fn download_path(&self) -> PathBuf {
        Path::new(&self.media_root).join(&self.downloads_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QBittorrentConfig {
    pub url: String,

    pub username: String,

    pub password: String,

    pub category: String,

    /// How often a running download is polled for progress (default: 1000 ms)
    pub poll_interval_ms: u64,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: "adminadmin".to_string(),
            category: "mediabox".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            library: LibraryConfig::default(),
            qbittorrent: QBittorrentConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Loads the first config file found in the search paths, or defaults.
    ///
    /// Returns the config together with the path it should be saved back to.
    pub fn load() -> Result<(Self, PathBuf)> {
        for path in Self::config_paths() {
            if path.exists() {
                let config = Self::load_from_path(&path)?;
                return Ok((config, path));
            }
        }

        Ok((Self::default(), Self::default_config_path()))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns defaults bound to `path`.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_config_path()];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mediabox").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mediabox").join("config.toml"));
        }

        paths
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Writes a default config to `path` unless a file already exists there.
    pub fn create_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.qbittorrent.url.is_empty() {
            anyhow::bail!("qBittorrent URL cannot be empty");
        }

        if self.qbittorrent.poll_interval_ms == 0 {
            anyhow::bail!("qBittorrent poll interval must be > 0");
        }

        Ok(())
    }
}
