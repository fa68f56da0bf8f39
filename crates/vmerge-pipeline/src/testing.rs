//! Test doubles shared by the pipeline's unit tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use vmerge_media::{EncodeJob, MediaError, MediaInfo, MediaResult, MediaToolkit, ProgressCallback};
use vmerge_models::RemoteDescriptor;
use vmerge_storage::{StorageError, StorageResult, Uploader};

/// Bytes a fake video must start with to be recognised as one.
pub const VIDEO_MARKER: &[u8] = b"VIDEO";

/// Toolkit that classifies files by their first bytes instead of decoding them.
///
/// Files starting with [`VIDEO_MARKER`] are 2-second 320x240 videos with
/// audio; any other non-empty file is a 3-second audio track.
#[derive(Debug, Default)]
pub struct MarkerToolkit {
    pub fail_encode: bool,
    pub encodes: AtomicUsize,
}

impl MarkerToolkit {
    pub fn failing_encode() -> Self {
        Self {
            fail_encode: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MediaToolkit for MarkerToolkit {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(MediaError::InvalidVideo("empty file".to_string()));
        }
        let is_video = bytes.starts_with(VIDEO_MARKER);
        Ok(MediaInfo {
            duration: if is_video { 2.0 } else { 3.0 },
            width: if is_video { 320 } else { 0 },
            height: if is_video { 240 } else { 0 },
            fps: if is_video { 30.0 } else { 0.0 },
            has_video: is_video,
            has_audio: true,
        })
    }

    async fn encode(
        &self,
        job: &EncodeJob,
        output: &Path,
        on_progress: ProgressCallback,
    ) -> MediaResult<()> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(&job.script_path, &job.filter_graph).await?;
        on_progress(vmerge_media::FfmpegProgress {
            out_time_ms: (job.duration * 500.0) as i64,
            ..Default::default()
        });
        if self.fail_encode {
            return Err(MediaError::ffmpeg_failed("simulated encoder crash", None, Some(1)));
        }
        tokio::fs::write(output, b"MERGED").await?;
        Ok(())
    }
}

/// Uploader that records calls and either succeeds or fails.
#[derive(Debug, Default)]
pub struct RecordingUploader {
    pub fail: bool,
    pub uploaded: Mutex<Vec<String>>,
}

impl RecordingUploader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, artifact: &Path) -> StorageResult<RemoteDescriptor> {
        if self.fail {
            return Err(StorageError::upload_failed("bucket unavailable"));
        }
        let size_bytes = tokio::fs::metadata(artifact).await?.len();
        let key = vmerge_storage::object_key("merged", artifact)?;
        self.uploaded.lock().unwrap().push(key.clone());
        Ok(RemoteDescriptor {
            bucket: "test-bucket".to_string(),
            key,
            size_bytes,
            url: None,
        })
    }
}
