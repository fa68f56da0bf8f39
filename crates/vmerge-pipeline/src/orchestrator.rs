//! Lifecycle of a single merge request.
//!
//! `Fetching → Assembling → Exporting → (Uploading) → Finalizing → Done`.
//! A failure in any of the first three stages moves the request to
//! `Failed`, removes everything it created and returns a [`MergeFailure`].
//! Upload failures are reported inside the successful outcome instead.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

use vmerge_media::fs_utils::is_dir_writable;
use vmerge_media::{
    AssembledTimeline, AssemblyInputs, ExportReport, Exporter, MediaAssembler, MediaToolkit,
    PercentCallback,
};
use vmerge_models::{MergeRequest, MergeResponse, MergeStage, RequestId, UploadStatus};
use vmerge_storage::Uploader;

use crate::config::PipelineConfig;
use crate::context::RequestContext;
use crate::error::{MergeError, MergeResult};
use crate::fetch::Fetcher;
use crate::janitor::{CleanupJob, CleanupReport, Janitor};
use crate::logging::RequestLogger;
use crate::metrics;

/// File name of an attached narration payload inside the scratch directory.
pub const NARRATION_FILE_NAME: &str = "narration.mp3";

/// One merge call: the descriptor plus an optional attached narration track.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub request: MergeRequest,
    pub narration: Option<Vec<u8>>,
}

impl MergeJob {
    pub fn new(request: MergeRequest) -> Self {
        Self {
            request,
            narration: None,
        }
    }

    pub fn with_narration(mut self, bytes: Vec<u8>) -> Self {
        self.narration = Some(bytes);
        self
    }
}

/// A finished merge and the cleanup it still owes.
///
/// The cleanup job must be dispatched only after `response` has been sent
/// on its way.
#[derive(Debug)]
pub struct MergeOutcome {
    pub response: MergeResponse,
    pub cleanup: CleanupJob,
}

/// A merge that aborted. Its scoped cleanup has already run.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct MergeFailure {
    pub request_id: RequestId,
    /// Stage the request was in when it failed
    pub stage: MergeStage,
    #[source]
    pub error: MergeError,
    pub cleanup: CleanupReport,
}

/// Drives requests through the merge pipeline.
#[derive(Clone)]
pub struct MergeOrchestrator {
    config: Arc<PipelineConfig>,
    fetcher: Fetcher,
    assembler: MediaAssembler,
    exporter: Exporter,
    uploader: Arc<dyn Uploader>,
    janitor: Arc<Janitor>,
}

impl MergeOrchestrator {
    pub fn new(
        config: Arc<PipelineConfig>,
        toolkit: Arc<dyn MediaToolkit>,
        uploader: Arc<dyn Uploader>,
    ) -> MergeResult<Self> {
        Ok(Self {
            fetcher: Fetcher::new(&config, Arc::clone(&toolkit))?,
            assembler: MediaAssembler::new(Arc::clone(&toolkit)),
            exporter: Exporter::new(toolkit, config.latest_path()),
            janitor: Arc::new(Janitor::new(&config)),
            uploader,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn janitor(&self) -> Arc<Janitor> {
        Arc::clone(&self.janitor)
    }

    pub fn upload_enabled(&self) -> bool {
        self.uploader.is_enabled()
    }

    /// Run one request to completion.
    pub async fn run(&self, job: MergeJob) -> Result<MergeOutcome, MergeFailure> {
        let ctx = RequestContext::new(&self.config);
        let logger = RequestLogger::new(ctx.id(), "merge");
        let span = logger.create_span();
        self.run_in_context(job, ctx, logger).instrument(span).await
    }

    async fn run_in_context(
        &self,
        job: MergeJob,
        mut ctx: RequestContext,
        logger: RequestLogger,
    ) -> Result<MergeOutcome, MergeFailure> {
        metrics::record_merge_started();
        logger.log_start(&format!(
            "{} video(s), background: {}, narration: {}, upload: {}",
            job.request.video_urls.len(),
            job.request.background_url().is_some(),
            job.narration.is_some(),
            job.request.upload_to_drive
        ));

        let export = match self.produce(&job, &mut ctx, &logger).await {
            Ok(report) => report,
            Err(error) => return Err(self.fail(ctx, &logger, error).await),
        };

        let upload = if job.request.upload_to_drive {
            ctx.advance(MergeStage::Uploading);
            logger.log_stage(MergeStage::Uploading);
            Some(self.upload(&export, &logger).await)
        } else {
            None
        };

        ctx.advance(MergeStage::Finalizing);
        let uploaded = upload.as_ref().is_some_and(UploadStatus::is_uploaded);
        let cleanup = if uploaded {
            CleanupJob::FullPurge {
                request_id: ctx.id().clone(),
            }
        } else {
            CleanupJob::Scoped {
                request_id: ctx.id().clone(),
                paths: ctx.scoped_paths(),
            }
        };
        let response = MergeResponse::success(
            ctx.artifact(),
            export.duration_secs,
            export.size_bytes,
            upload,
        );
        ctx.advance(MergeStage::Done);

        metrics::record_merge_completed();
        logger.log_completion(&format!(
            "{} ({} bytes, {:.2}s), cleanup: {}",
            response.artifact,
            response.size_bytes,
            response.duration_secs,
            cleanup.mode()
        ));

        Ok(MergeOutcome { response, cleanup })
    }

    /// The failable stages, short-circuiting on the first error.
    async fn produce(
        &self,
        job: &MergeJob,
        ctx: &mut RequestContext,
        logger: &RequestLogger,
    ) -> MergeResult<ExportReport> {
        logger.log_stage(MergeStage::Fetching);
        let inputs = self.fetch_sources(job, ctx, logger).await?;

        ctx.advance(MergeStage::Assembling);
        logger.log_stage(MergeStage::Assembling);
        let timeline = self.assembler.assemble(&inputs).await?;

        ctx.advance(MergeStage::Exporting);
        logger.log_stage(MergeStage::Exporting);
        let report = self.export(&timeline, ctx, logger).await?;

        if let Some(latest) = &report.latest_copy {
            ctx.claim(latest.clone());
        }
        Ok(report)
    }

    async fn fetch_sources(
        &self,
        job: &MergeJob,
        ctx: &RequestContext,
        logger: &RequestLogger,
    ) -> MergeResult<AssemblyInputs> {
        ctx.prepare(&self.config).await?;
        let dir = ctx.scratch_dir();

        let videos = self.fetcher.fetch_videos(&job.request.video_urls, dir).await?;

        let background = match job.request.background_url() {
            Some(url) => Some(self.fetcher.fetch_background(url, dir).await?),
            None => None,
        };

        let narration = match job.narration.as_deref() {
            Some([]) => {
                logger.log_warning("Attached narration is empty; ignoring it");
                None
            }
            Some(bytes) => {
                let path = ctx.scratch_file(NARRATION_FILE_NAME);
                tokio::fs::write(&path, bytes).await?;
                Some(path)
            }
            None => None,
        };

        let fetched = videos.len() + usize::from(background.is_some());
        logger.log_progress(&format!("fetched {fetched} source file(s)"));

        Ok(AssemblyInputs {
            videos,
            background,
            narration,
            background_volume: job.request.background_volume,
            work_dir: dir.to_path_buf(),
        })
    }

    async fn export(
        &self,
        timeline: &AssembledTimeline,
        ctx: &RequestContext,
        logger: &RequestLogger,
    ) -> MergeResult<ExportReport> {
        if !is_dir_writable(&self.config.output_root).await {
            return Err(MergeError::export("output directory is not writable"));
        }

        let observer: PercentCallback = {
            let logger = logger.clone();
            let logged = AtomicU8::new(0);
            Box::new(move |percent| {
                if let Some(decile) = crossed_decile(&logged, percent) {
                    logger.log_progress(&format!("export {decile}%"));
                }
            })
        };

        Ok(self
            .exporter
            .export(timeline, ctx.artifact_path(), Some(observer))
            .await?)
    }

    async fn upload(&self, export: &ExportReport, logger: &RequestLogger) -> UploadStatus {
        let status = match self.uploader.upload(&export.path).await {
            Ok(descriptor) => {
                logger.log_progress(&format!("uploaded to {}/{}", descriptor.bucket, descriptor.key));
                UploadStatus::Uploaded(descriptor)
            }
            Err(e) => {
                let error = MergeError::from(e);
                logger.log_warning(&error.to_string());
                UploadStatus::Failed {
                    error: error.to_string(),
                }
            }
        };
        metrics::record_upload(status.is_uploaded());
        status
    }

    async fn fail(
        &self,
        mut ctx: RequestContext,
        logger: &RequestLogger,
        error: MergeError,
    ) -> MergeFailure {
        let stage = ctx.stage();
        logger.log_error(stage, &error.to_string());
        metrics::record_merge_failed(stage, error.kind());
        ctx.advance(MergeStage::Failed);

        let cleanup = self.janitor.cleanup(&ctx.scoped_paths()).await;

        MergeFailure {
            request_id: ctx.id().clone(),
            stage,
            error,
            cleanup,
        }
    }
}

/// The decile `percent` falls in, if no report has reached it yet.
///
/// `logged` holds one past the highest decile seen, zero before any.
fn crossed_decile(logged: &AtomicU8, percent: u8) -> Option<u8> {
    let mark = percent.min(100) / 10 + 1;
    let previous = logged.fetch_max(mark, Ordering::Relaxed);
    (mark > previous).then_some((mark - 1) * 10)
}
