pub mod downloads;
pub use downloads::{DownloadError, DownloadManager, TaskSnapshot};

pub mod engine;
pub use engine::{EngineError, EngineEvent, TaskEvents, TorrentEngine, TorrentSource};

pub mod settings;
pub use settings::{Settings, SettingsError, SettingsStore};
