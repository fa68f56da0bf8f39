//! The upload collaborator.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use vmerge_models::RemoteDescriptor;

use crate::client::{R2Client, R2Config};
use crate::error::{StorageError, StorageResult};

/// Persists a local artifact remotely.
///
/// Implementations must not touch the local file beyond reading it.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, artifact: &Path) -> StorageResult<RemoteDescriptor>;

    /// Whether uploads can succeed at all.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Object key for an artifact under `prefix`.
pub fn object_key(prefix: &str, artifact: &Path) -> StorageResult<String> {
    let name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| StorageError::InvalidKey(artifact.display().to_string()))?;

    let prefix = prefix.trim_matches('/');
    Ok(if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    })
}

/// Uploads artifacts to an R2 bucket.
#[derive(Clone)]
pub struct R2Uploader {
    client: R2Client,
    key_prefix: String,
    url_expiry: Duration,
}

impl R2Uploader {
    pub async fn new(config: R2Config) -> StorageResult<Self> {
        let client = R2Client::new(&config).await?;
        Ok(Self {
            client,
            key_prefix: config.key_prefix,
            url_expiry: config.url_expiry,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        Self::new(R2Config::from_env()?).await
    }

    pub fn client(&self) -> &R2Client {
        &self.client
    }
}

#[async_trait]
impl Uploader for R2Uploader {
    async fn upload(&self, artifact: &Path) -> StorageResult<RemoteDescriptor> {
        let key = object_key(&self.key_prefix, artifact)?;
        let size_bytes = tokio::fs::metadata(artifact).await?.len();

        self.client.upload_file(artifact, &key, "video/mp4").await?;

        // The object is stored; a missing link only loses convenience
        let url = match self.client.presign_get(&key, self.url_expiry).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to presign download URL");
                None
            }
        };

        info!(bucket = %self.client.bucket(), key = %key, size_bytes, "Artifact uploaded");

        Ok(RemoteDescriptor {
            bucket: self.client.bucket().to_string(),
            key,
            size_bytes,
            url,
        })
    }
}

/// Stand-in used when no storage is configured; every upload fails.
#[derive(Debug, Clone, Default)]
pub struct DisabledUploader;

#[async_trait]
impl Uploader for DisabledUploader {
    async fn upload(&self, _artifact: &Path) -> StorageResult<RemoteDescriptor> {
        Err(StorageError::config_error("remote storage is not configured"))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
