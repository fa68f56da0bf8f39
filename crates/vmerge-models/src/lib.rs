//! Shared data models for the vmerge service.
//!
//! This crate provides Serde-serializable types for:
//! - Merge requests and their validation
//! - Typed request and artifact identifiers
//! - Pipeline stages
//! - Response payloads returned by the HTTP API

pub mod artifact;
pub mod request;
pub mod response;
pub mod stage;

// Re-export common types
pub use artifact::{ArtifactHandle, RequestId, DEFAULT_LATEST_ARTIFACT_NAME};
pub use request::{parse_upload_override, MergeRequest, RequestError, DEFAULT_BACKGROUND_VOLUME};
pub use response::{ErrorBody, MergeResponse, RemoteDescriptor, UploadStatus};
pub use stage::MergeStage;
