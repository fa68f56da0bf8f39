//! Filesystem helpers for artifacts and working roots.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Copy `src` over `dst` without ever exposing a partially written `dst`.
///
/// The bytes go to a uniquely named temporary file next to `dst`, which is
/// then renamed into place. Concurrent writers each rename a complete file;
/// the last rename wins.
pub async fn copy_atomic(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<u64> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let file_name = dst
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MediaError::internal(format!("invalid destination {}", dst.display())))?;
    let tmp_dst = dst.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let copied = fs::copy(src, &tmp_dst).await.map_err(|e| {
        tracing::error!(
            "Failed to copy {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        tracing::error!(
            "Failed to rename {} -> {}: {}",
            tmp_dst.display(),
            dst.display(),
            e
        );
        return Err(MediaError::from(e));
    }

    Ok(copied)
}

/// Size of a file, or `None` when it does not exist.
pub async fn file_size(path: impl AsRef<Path>) -> MediaResult<Option<u64>> {
    match fs::metadata(path.as_ref()).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Whether a file can be created in `dir`.
pub async fn is_dir_writable(dir: impl AsRef<Path>) -> bool {
    let probe = dir
        .as_ref()
        .join(format!(".write_probe_{}", uuid::Uuid::new_v4()));
    match fs::write(&probe, b"").await {
        Ok(()) => {
            let _ = fs::remove_file(&probe).await;
            true
        }
        Err(_) => false,
    }
}

/// Names of the entries directly under `dir`, sorted; empty if `dir` is missing.
pub async fn list_entry_names(dir: impl AsRef<Path>) -> MediaResult<Vec<String>> {
    let mut entries = match fs::read_dir(dir.as_ref()).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_atomic_keeps_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("merged_video_a.mp4");
        let dst = dir.path().join("final_merged_video.mp4");

        fs::write(&src, b"test content").await.unwrap();

        let copied = copy_atomic(&src, &dst).await.unwrap();

        assert_eq!(copied, 12);
        assert!(src.exists(), "Source file should remain");
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "test content");
    }

    #[tokio::test]
    async fn test_copy_atomic_overwrites_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.mp4");
        let dst = dir.path().join("latest.mp4");

        fs::write(&src, b"new content").await.unwrap();
        fs::write(&dst, b"old content").await.unwrap();

        copy_atomic(&src, &dst).await.unwrap();

        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new content");
        assert_eq!(
            list_entry_names(dir.path()).await.unwrap(),
            vec!["latest.mp4", "source.mp4"]
        );
    }

    #[tokio::test]
    async fn test_copy_atomic_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = copy_atomic(dir.path().join("nope.mp4"), dir.path().join("latest.mp4")).await;

        assert!(result.is_err());
        assert!(list_entry_names(dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writable_and_listing() {
        let dir = TempDir::new().unwrap();
        assert!(is_dir_writable(dir.path()).await);
        assert!(!is_dir_writable(dir.path().join("missing")).await);
        assert!(list_entry_names(dir.path().join("missing")).await.unwrap().is_empty());
        assert_eq!(file_size(dir.path().join("missing")).await.unwrap(), None);
    }
}
