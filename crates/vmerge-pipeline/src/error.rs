//! Merge pipeline error types.

use thiserror::Error;
use vmerge_media::MediaError;
use vmerge_storage::StorageError;

/// Result type for pipeline operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Terminal failures of a merge request.
///
/// Everything except [`MergeError::Upload`] aborts the request. Cleanup
/// problems are never errors; see [`CleanupWarning`](crate::janitor::CleanupWarning).
#[derive(Debug, Error)]
pub enum MergeError {
    /// Network failure, timeout or non-success status while downloading
    #[error("{0}")]
    Fetch(String),

    /// Downloaded file is empty or not the expected media
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    ClipLoad(String),

    #[error("Concatenation failed: {0}")]
    Concatenation(String),

    #[error("Audio processing failed: {0}")]
    AudioProcessing(String),

    #[error("Export failed: {0}")]
    Export(String),

    /// Reported inside a successful response, never as a request failure
    #[error("{0}")]
    Upload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MergeError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MergeError::Fetch(_) => "fetch",
            MergeError::Validation(_) => "validation",
            MergeError::ClipLoad(_) => "clip_load",
            MergeError::Concatenation(_) => "concatenation",
            MergeError::AudioProcessing(_) => "audio_processing",
            MergeError::Export(_) => "export",
            MergeError::Upload(_) => "upload",
            MergeError::Io(_) => "io",
            MergeError::Config(_) => "config",
        }
    }

    /// Whether the failure lies with a remote source rather than this service.
    pub fn is_upstream(&self) -> bool {
        matches!(self, MergeError::Fetch(_) | MergeError::Validation(_))
    }
}

impl From<MediaError> for MergeError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::ClipLoad { .. } | MediaError::FileNotFound(_) => {
                MergeError::ClipLoad(e.to_string())
            }
            MediaError::InvalidVideo(_) | MediaError::FfprobeFailed { .. } => {
                MergeError::Validation(e.to_string())
            }
            MediaError::Concatenation(msg) => MergeError::Concatenation(msg),
            MediaError::AudioProcessing(msg) => MergeError::AudioProcessing(msg),
            MediaError::Export(msg) => MergeError::Export(msg),
            MediaError::FfmpegNotFound
            | MediaError::FfmpegFailed { .. }
            | MediaError::Timeout(_) => MergeError::Export(e.to_string()),
            MediaError::FfprobeNotFound => MergeError::Config(e.to_string()),
            MediaError::Io(io) => MergeError::Io(io),
            MediaError::JsonParse(_) | MediaError::Internal(_) => {
                MergeError::Concatenation(e.to_string())
            }
        }
    }
}

impl From<StorageError> for MergeError {
    fn from(e: StorageError) -> Self {
        MergeError::Upload(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_map_to_taxonomy() {
        let err: MergeError = MediaError::clip_load(3, "no video stream").into();
        assert!(matches!(err, MergeError::ClipLoad(_)));
        assert_eq!(err.to_string(), "Failed to load video 3: no video stream");

        let err: MergeError = MediaError::audio("bad track").into();
        assert_eq!(err.kind(), "audio_processing");

        let err: MergeError = MediaError::Timeout(3600).into();
        assert!(matches!(err, MergeError::Export(_)));
    }

    #[test]
    fn test_storage_errors_are_upload_errors() {
        let err: MergeError = StorageError::config_error("missing bucket").into();
        assert_eq!(err.kind(), "upload");
        assert!(!err.is_upstream());
    }
}
