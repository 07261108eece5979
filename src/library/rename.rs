use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use super::{LibraryError, join_relative, normalize_relative, resolve};

/// Renames a root-relative entry to `new_name` within the same directory.
///
/// Returns the new root-relative path. Fails without touching either entry
/// if the target name is already taken.
pub async fn rename_entry(root: &Path, old_rel: &str, new_name: &str) -> Result<String, LibraryError> {
    if new_name.is_empty() {
        return Err(LibraryError::InvalidName("new name is empty".to_string()));
    }

    let old_rel = collapse_parent_segments(old_rel);
    if old_rel.is_empty() {
        return Err(LibraryError::InvalidName(
            "the media root cannot be renamed".to_string(),
        ));
    }

    let old_full = resolve(root, &old_rel);
    let parent_rel = old_rel
        .rsplit_once('/')
        .map_or("", |(parent, _)| parent)
        .to_string();
    let parent_full = resolve(root, &parent_rel);
    let new_full = parent_full.join(new_name);
    let new_rel = join_relative(&parent_rel, new_name);

    if let Err(e) = tokio::fs::symlink_metadata(&old_full).await {
        return Err(if e.kind() == ErrorKind::NotFound {
            LibraryError::NotFound(old_rel)
        } else {
            LibraryError::io(&old_full, e)
        });
    }

    if new_full == old_full {
        return Ok(new_rel);
    }

    match tokio::fs::symlink_metadata(&new_full).await {
        Ok(_) => return Err(LibraryError::AlreadyExists(new_rel)),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(LibraryError::io(&new_full, e)),
    }

    tokio::fs::rename(&old_full, &new_full)
        .await
        .map_err(|e| LibraryError::io(&old_full, e))?;

    info!(from = %old_rel, to = %new_rel, "Renamed entry");
    Ok(new_rel)
}

/// Folds `..` into the preceding segment, so `a/b/..` names `a` and its
/// sibling directory is the root. Leading `..` segments are kept.
fn collapse_parent_segments(rel: &str) -> String {
    let normalized = normalize_relative(rel);
    let mut segments: Vec<&str> = Vec::new();
    for segment in normalized.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." && segments.last().is_some_and(|last| *last != "..") {
            segments.pop();
        } else {
            segments.push(segment);
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rename_within_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/b.png"), b"img").unwrap();

        let new_rel = rename_entry(dir.path(), "a/b.png", "c.png").await.unwrap();
        assert_eq!(new_rel, "a/c.png");
        assert!(!dir.path().join("a/b.png").exists());
        assert_eq!(std::fs::read(dir.path().join("a/c.png")).unwrap(), b"img");
    }

    #[tokio::test]
    async fn test_rename_onto_existing_keeps_both() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.jpg"), b"1").unwrap();
        std::fs::write(dir.path().join("two.jpg"), b"2").unwrap();

        let err = rename_entry(dir.path(), "one.jpg", "two.jpg").await.unwrap_err();
        assert!(matches!(err, LibraryError::AlreadyExists(_)));
        assert_eq!(std::fs::read(dir.path().join("one.jpg")).unwrap(), b"1");
        assert_eq!(std::fs::read(dir.path().join("two.jpg")).unwrap(), b"2");
    }

    #[test]
    fn test_collapse_parent_segments() {
        assert_eq!(collapse_parent_segments("a/b/.."), "a");
        assert_eq!(collapse_parent_segments("a/../c.png"), "c.png");
        assert_eq!(collapse_parent_segments("a/.."), "");
        assert_eq!(collapse_parent_segments("../x"), "../x");
    }

    #[tokio::test]
    async fn test_rename_through_parent_segment_targets_resolved_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();

        let new_rel = rename_entry(dir.path(), "a/b/..", "z").await.unwrap();
        assert_eq!(new_rel, "z");
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().join("z/b").is_dir());
    }

    #[tokio::test]
    async fn test_rename_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("old")).unwrap();

        rename_entry(dir.path(), "old", "new").await.unwrap();
        assert!(dir.path().join("new").is_dir());
    }

    #[tokio::test]
    async fn test_rename_to_same_name_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.gif"), b"x").unwrap();

        let new_rel = rename_entry(dir.path(), "x.gif", "x.gif").await.unwrap();
        assert_eq!(new_rel, "x.gif");
        assert!(dir.path().join("x.gif").exists());
    }

    #[tokio::test]
    async fn test_rename_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            rename_entry(dir.path(), "x.gif", "").await,
            Err(LibraryError::InvalidName(_))
        ));
        assert!(matches!(
            rename_entry(dir.path(), "/", "y").await,
            Err(LibraryError::InvalidName(_))
        ));
        assert!(matches!(
            rename_entry(dir.path(), "missing.png", "y.png").await,
            Err(LibraryError::NotFound(_))
        ));
    }
}
