//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vmerge_models::{ArtifactHandle, RequestId, DEFAULT_LATEST_ARTIFACT_NAME};

/// Pipeline configuration, injected into every component at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of per-request scratch directories
    pub temp_root: PathBuf,
    /// Root holding exported artifacts and the recovery copy
    pub output_root: PathBuf,
    /// Timeout for a single download
    pub fetch_timeout: Duration,
    /// Content-Length mismatch tolerated silently, in bytes
    pub fetch_size_tolerance: u64,
    /// Maximum concurrent downloads per request
    pub max_download_parallel: usize,
    /// Removal attempts per path before giving up
    pub cleanup_max_attempts: u32,
    /// Pause between removal attempts
    pub cleanup_retry_delay: Duration,
    /// File name of the recovery copy inside the output root
    pub latest_artifact_name: String,
    /// Upper bound for a single encode
    pub export_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_root: absolutize("temp"),
            output_root: absolutize("output"),
            fetch_timeout: Duration::from_secs(30),
            fetch_size_tolerance: 100,
            max_download_parallel: 4,
            cleanup_max_attempts: 3,
            cleanup_retry_delay: Duration::from_millis(1000),
            latest_artifact_name: DEFAULT_LATEST_ARTIFACT_NAME.to_string(),
            export_timeout: Duration::from_secs(3600),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            temp_root: std::env::var("VMERGE_TEMP_DIR")
                .map(absolutize)
                .unwrap_or(defaults.temp_root),
            output_root: std::env::var("VMERGE_OUTPUT_DIR")
                .map(absolutize)
                .unwrap_or(defaults.output_root),
            fetch_timeout: Duration::from_secs(
                std::env::var("FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            fetch_size_tolerance: std::env::var("FETCH_SIZE_TOLERANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fetch_size_tolerance),
            max_download_parallel: std::env::var("MAX_DOWNLOAD_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_download_parallel),
            cleanup_max_attempts: std::env::var("CLEANUP_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.cleanup_max_attempts),
            cleanup_retry_delay: Duration::from_millis(
                std::env::var("CLEANUP_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            latest_artifact_name: std::env::var("LATEST_ARTIFACT_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.latest_artifact_name),
            export_timeout: Duration::from_secs(
                std::env::var("EXPORT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }

    /// Config rooted at the given directories, other values default.
    pub fn with_roots(temp_root: impl AsRef<Path>, output_root: impl AsRef<Path>) -> Self {
        Self {
            temp_root: absolutize(temp_root.as_ref()),
            output_root: absolutize(output_root.as_ref()),
            ..Self::default()
        }
    }

    /// Scratch directory owned by one request.
    pub fn scratch_dir(&self, id: &RequestId) -> PathBuf {
        id.scratch_dir(&self.temp_root)
    }

    /// Location of a request's artifact.
    pub fn artifact_path(&self, artifact: &ArtifactHandle) -> PathBuf {
        artifact.path_in(&self.output_root)
    }

    /// Location of the recovery copy.
    pub fn latest_path(&self) -> PathBuf {
        self.output_root.join(&self.latest_artifact_name)
    }

    /// Both working roots.
    pub fn roots(&self) -> [&Path; 2] {
        [&self.temp_root, &self.output_root]
    }

    /// Create both roots if missing.
    pub async fn ensure_roots(&self) -> std::io::Result<()> {
        for root in self.roots() {
            tokio::fs::create_dir_all(root).await?;
        }
        Ok(())
    }
}

fn absolutize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
