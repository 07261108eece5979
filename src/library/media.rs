use std::io::ErrorKind;
use std::path::Path;

use super::{LibraryError, resolve};
use crate::constants::DEFAULT_CONTENT_TYPE;

/// A fully buffered media file ready to be sent to the client.
#[derive(Debug)]
pub struct MediaFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl MediaFile {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Content type for a media path, from a fixed extension table.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Reads a root-relative file fully into memory.
///
/// A missing target or anything that is not a regular file is reported as
/// [`LibraryError::NotFound`].
pub async fn read_media(root: &Path, rel: &str) -> Result<MediaFile, LibraryError> {
    let full_path = resolve(root, rel);

    let metadata = match tokio::fs::metadata(&full_path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(LibraryError::NotFound(rel.to_string()));
        }
        Err(e) => return Err(LibraryError::io(&full_path, e)),
    };

    if !metadata.is_file() {
        return Err(LibraryError::NotFound(rel.to_string()));
    }

    let bytes = match tokio::fs::read(&full_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(LibraryError::NotFound(rel.to_string()));
        }
        Err(e) => return Err(LibraryError::io(&full_path, e)),
    };

    Ok(MediaFile {
        bytes,
        content_type: content_type_for(&full_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_table() {
        assert_eq!(content_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(content_type_for(Path::new("a.mov")), "video/quicktime");
        assert_eq!(content_type_for(Path::new("a.mkv")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for(Path::new("noext")), DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_read_media_returns_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pics")).unwrap();
        std::fs::write(dir.path().join("pics/dog.gif"), b"GIF89a").unwrap();

        let media = read_media(dir.path(), "pics/dog.gif").await.unwrap();
        assert_eq!(media.bytes, b"GIF89a");
        assert_eq!(media.len(), 6);
        assert_eq!(media.content_type, "image/gif");
    }

    #[tokio::test]
    async fn test_read_media_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pics")).unwrap();

        let err = read_media(dir.path(), "pics").await.unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_media_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_media(dir.path(), "ghost.png").await.unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(_)));
    }
}
