//! Response payloads of the merge API.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactHandle, RequestId};

/// Error body returned for any failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Where the uploaded artifact now lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RemoteDescriptor {
    /// Bucket holding the object
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Uploaded size in bytes
    pub size_bytes: u64,
    /// Time-limited download URL, when one could be issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Outcome of the optional upload step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    Uploaded(RemoteDescriptor),
    Failed { error: String },
}

impl UploadStatus {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadStatus::Uploaded(_))
    }
}

/// Success-shaped merge result.
///
/// An upload failure is reported inline through `upload`; the merge itself
/// still succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergeResponse {
    pub status: String,
    pub request_id: RequestId,
    pub artifact: String,
    pub duration_secs: f64,
    pub size_bytes: u64,
    pub upload: Option<UploadStatus>,
}

impl MergeResponse {
    pub fn success(
        artifact: &ArtifactHandle,
        duration_secs: f64,
        size_bytes: u64,
        upload: Option<UploadStatus>,
    ) -> Self {
        Self {
            status: "success".to_string(),
            request_id: artifact.request_id().clone(),
            artifact: artifact.file_name(),
            duration_secs,
            size_bytes,
            upload,
        }
    }
}
