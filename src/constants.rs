pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub mod downloads {

    /// Prefix of the qBittorrent tag that ties a torrent to a task.
    pub const TAG_PREFIX: &str = "mediabox-";

    pub const EVENT_CHANNEL_CAPACITY: usize = 256;

    /// Upper bound on a `POST /api/bt` body, `.torrent` upload included.
    pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
}

pub mod intervals {
    use std::time::Duration;

    pub const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);
}
