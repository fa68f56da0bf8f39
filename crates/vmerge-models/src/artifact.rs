//! Request and artifact identity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the recovery copy of the most recent artifact.
pub const DEFAULT_LATEST_ARTIFACT_NAME: &str = "final_merged_video.mp4";

/// Unique identifier for a merge request.
///
/// Every path a request touches is namespaced under this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scratch directory of this request under the given temp root.
    pub fn scratch_dir(&self, temp_root: &Path) -> PathBuf {
        temp_root.join(&self.0)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to the exported artifact of one request.
///
/// The handle only knows names; the output root is supplied by the caller so
/// that the same handle can never resolve into another request's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactHandle {
    request_id: RequestId,
}

impl ArtifactHandle {
    /// Create the artifact handle for a request.
    pub fn for_request(request_id: &RequestId) -> Self {
        Self {
            request_id: request_id.clone(),
        }
    }

    /// Owning request.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Request-unique file name, e.g. `merged_video_<id>.mp4`.
    pub fn file_name(&self) -> String {
        format!("merged_video_{}.mp4", self.request_id)
    }

    /// Full path of the artifact under the output root.
    pub fn path_in(&self, output_root: &Path) -> PathBuf {
        output_root.join(self.file_name())
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
