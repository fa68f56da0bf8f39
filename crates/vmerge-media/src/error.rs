//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Failed to load video {position}: {message}")]
    ClipLoad { position: usize, message: String },

    #[error("Concatenation failed: {0}")]
    Concatenation(String),

    #[error("Audio processing failed: {0}")]
    AudioProcessing(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a clip load error for the clip at one-based `position`.
    pub fn clip_load(position: usize, message: impl Into<String>) -> Self {
        Self::ClipLoad {
            position,
            message: message.into(),
        }
    }

    /// Create a concatenation error.
    pub fn concatenation(message: impl Into<String>) -> Self {
        Self::Concatenation(message.into())
    }

    /// Create an audio processing error.
    pub fn audio(message: impl Into<String>) -> Self {
        Self::AudioProcessing(message.into())
    }

    /// Create an export error.
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
