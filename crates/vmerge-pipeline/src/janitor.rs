//! Best-effort removal of request files and working roots.
//!
//! Nothing in this module returns an error to its caller. Paths that cannot
//! be removed within the retry bound are reported as [`CleanupWarning`]s,
//! logged, and left behind.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use vmerge_models::RequestId;

use crate::config::PipelineConfig;
use crate::metrics;
use crate::retry::{retry_async, RetryPolicy, RetryResult};

/// Removes one filesystem path.
#[async_trait]
pub trait PathRemover: Send + Sync {
    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Removes files individually and directories recursively.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

#[async_trait]
impl PathRemover for FsRemover {
    async fn remove(&self, path: &Path) -> io::Result<()> {
        let result = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
            Ok(_) => tokio::fs::remove_file(path).await,
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// A path that survived every removal attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub attempts: u32,
    pub error: String,
}

impl CleanupWarning {
    fn log(&self) {
        metrics::record_cleanup_warning();
        warn!(
            path = %self.path.display(),
            attempts = self.attempts,
            error = %self.error,
            "Giving up on removing path"
        );
    }
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub warnings: Vec<CleanupWarning>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Entries directly under a working root.
#[derive(Debug, Clone, PartialEq)]
pub struct RootListing {
    pub path: PathBuf,
    pub exists: bool,
    pub entries: Vec<String>,
}

impl RootListing {
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }
}

/// Outcome of a full purge.
#[derive(Debug, Clone, PartialEq)]
pub struct PurgeReport {
    pub cleanup: CleanupReport,
    pub temp: RootListing,
    pub output: RootListing,
}

impl PurgeReport {
    pub fn remaining(&self) -> usize {
        self.temp.file_count() + self.output.file_count()
    }
}

/// Deferred cleanup work for one finished request.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanupJob {
    /// Remove exactly these paths
    Scoped {
        request_id: RequestId,
        paths: Vec<PathBuf>,
    },
    /// Empty both working roots; only after a durable upload
    FullPurge { request_id: RequestId },
}

impl CleanupJob {
    pub fn request_id(&self) -> &RequestId {
        match self {
            CleanupJob::Scoped { request_id, .. } | CleanupJob::FullPurge { request_id } => request_id,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CleanupJob::Scoped { .. } => "scoped",
            CleanupJob::FullPurge { .. } => "full_purge",
        }
    }
}

/// Removes paths with bounded retries.
#[derive(Clone)]
pub struct Janitor {
    remover: Arc<dyn PathRemover>,
    policy: RetryPolicy,
    temp_root: PathBuf,
    output_root: PathBuf,
}

impl Janitor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_remover(config, Arc::new(FsRemover))
    }

    pub fn with_remover(config: &PipelineConfig, remover: Arc<dyn PathRemover>) -> Self {
        Self {
            remover,
            policy: RetryPolicy::fixed(
                "remove_path",
                config.cleanup_max_attempts,
                config.cleanup_retry_delay,
            ),
            temp_root: config.temp_root.clone(),
            output_root: config.output_root.clone(),
        }
    }

    /// Remove `path` if present. `Ok(false)` means there was nothing to do.
    pub async fn remove_path(&self, path: &Path) -> Result<bool, CleanupWarning> {
        if !exists(path).await {
            return Ok(false);
        }

        let remover = &*self.remover;
        match retry_async(&self.policy, move || remover.remove(path)).await {
            RetryResult::Success { attempts, .. } => {
                debug!(path = %path.display(), attempts, "Removed path");
                Ok(true)
            }
            RetryResult::Failed { error, attempts } => Err(CleanupWarning {
                path: path.to_path_buf(),
                attempts,
                error: error.to_string(),
            }),
        }
    }

    /// Remove every path, logging the ones that cannot be removed.
    pub async fn cleanup(&self, paths: &[PathBuf]) -> CleanupReport {
        let mut report = CleanupReport::default();
        for path in paths {
            match self.remove_path(path).await {
                Ok(true) => report.removed.push(path.clone()),
                Ok(false) => {}
                Err(warning) => {
                    warning.log();
                    report.warnings.push(warning);
                }
            }
        }
        report
    }

    /// Current contents of both roots.
    pub async fn list_roots(&self) -> (RootListing, RootListing) {
        (list_root(&self.temp_root).await, list_root(&self.output_root).await)
    }

    /// Remove everything under both roots, then recreate them empty.
    pub async fn full_purge(&self) -> PurgeReport {
        let mut targets = Vec::new();
        for root in [&self.temp_root, &self.output_root] {
            for name in list_root(root).await.entries {
                targets.push(root.join(name));
            }
        }

        let cleanup = self.cleanup(&targets).await;

        for root in [&self.temp_root, &self.output_root] {
            if let Err(e) = tokio::fs::create_dir_all(root).await {
                warn!(root = %root.display(), error = %e, "Failed to recreate working root");
            }
        }

        let (temp, output) = self.list_roots().await;
        let report = PurgeReport {
            cleanup,
            temp,
            output,
        };

        if report.remaining() > 0 {
            warn!(
                temp_remaining = report.temp.file_count(),
                output_remaining = report.output.file_count(),
                "Some files could not be removed"
            );
        } else {
            info!(removed = report.cleanup.removed.len(), "Working roots purged");
        }

        report
    }

    /// Execute a deferred job.
    pub async fn run(&self, job: &CleanupJob) -> CleanupReport {
        info!(request_id = %job.request_id(), mode = job.mode(), "Running cleanup");
        metrics::record_cleanup_job(job.mode());
        match job {
            CleanupJob::Scoped { paths, .. } => self.cleanup(paths).await,
            CleanupJob::FullPurge { .. } => self.full_purge().await.cleanup,
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

async fn list_root(root: &Path) -> RootListing {
    let exists = tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir());
    let entries = match vmerge_media::fs_utils::list_entry_names(root).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "Failed to list working root");
            Vec::new()
        }
    };
    RootListing {
        path: root.to_path_buf(),
        exists,
        entries,
    }
}
