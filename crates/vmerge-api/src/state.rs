//! Application state.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vmerge_media::{check_ffmpeg, check_ffprobe, FfmpegToolkit, MediaToolkit};
use vmerge_pipeline::{CleanupQueue, Janitor, MergeOrchestrator, PipelineConfig};
use vmerge_storage::{DisabledUploader, R2Uploader, Uploader};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<PipelineConfig>,
    pub orchestrator: MergeOrchestrator,
    pub janitor: Arc<Janitor>,
    pub cleanup: CleanupQueue,
}

impl AppState {
    /// Assemble state around an orchestrator and start the cleanup worker.
    ///
    /// The returned handle finishes once every clone of the state is dropped
    /// and queued cleanup has drained.
    pub fn new(config: ApiConfig, orchestrator: MergeOrchestrator) -> (Self, JoinHandle<()>) {
        let janitor = orchestrator.janitor();
        let (cleanup, worker) = CleanupQueue::spawn(Arc::clone(&janitor));
        let state = Self {
            config,
            pipeline: Arc::new(orchestrator.config().clone()),
            orchestrator,
            janitor,
            cleanup,
        };
        (state, worker)
    }

    /// Build the production state from environment variables.
    pub async fn from_env(config: ApiConfig) -> Result<(Self, JoinHandle<()>), ApiError> {
        let pipeline = Arc::new(PipelineConfig::from_env());
        pipeline
            .ensure_roots()
            .await
            .map_err(|e| ApiError::internal(format!("failed to create working roots: {e}")))?;
        info!(
            temp_root = %pipeline.temp_root.display(),
            output_root = %pipeline.output_root.display(),
            "Working roots ready"
        );

        for check in [check_ffmpeg(), check_ffprobe()] {
            match check {
                Ok(path) => info!(path = %path.display(), "Found media tool"),
                Err(e) => warn!(error = %e, "Media tool missing; merges will fail"),
            }
        }

        let toolkit: Arc<dyn MediaToolkit> =
            Arc::new(FfmpegToolkit::with_timeout(pipeline.export_timeout.as_secs()));
        let uploader = uploader_from_env().await;

        let orchestrator = MergeOrchestrator::new(pipeline, toolkit, uploader)
            .map_err(|e| ApiError::internal(e.to_string()))?;

        Ok(Self::new(config, orchestrator))
    }
}

async fn uploader_from_env() -> Arc<dyn Uploader> {
    match R2Uploader::from_env().await {
        Ok(uploader) => {
            if let Err(e) = uploader.client().check_connectivity().await {
                warn!(error = %e, "Storage bucket is not reachable; uploads may fail");
            }
            info!(bucket = uploader.client().bucket(), "Uploads enabled");
            Arc::new(uploader)
        }
        Err(e) => {
            warn!(error = %e, "Storage not configured; uploads disabled");
            Arc::new(DisabledUploader)
        }
    }
}
