//! Per-request state.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

use vmerge_models::{ArtifactHandle, MergeStage, RequestId};

use crate::config::PipelineConfig;
use crate::metrics;

/// Everything one request owns on disk, plus its current stage.
///
/// All paths are namespaced by the request id, so two contexts never share
/// a path. The recovery copy is the exception and is only claimed once this
/// request has written it.
#[derive(Debug)]
pub struct RequestContext {
    id: RequestId,
    artifact: ArtifactHandle,
    scratch_dir: PathBuf,
    artifact_path: PathBuf,
    claimed: Vec<PathBuf>,
    stage: MergeStage,
    stage_started: Instant,
}

impl RequestContext {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_id(config, RequestId::new())
    }

    pub fn with_id(config: &PipelineConfig, id: RequestId) -> Self {
        let artifact = ArtifactHandle::for_request(&id);
        Self {
            scratch_dir: config.scratch_dir(&id),
            artifact_path: config.artifact_path(&artifact),
            id,
            artifact,
            claimed: Vec::new(),
            stage: MergeStage::default(),
            stage_started: Instant::now(),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn artifact(&self) -> &ArtifactHandle {
        &self.artifact
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn stage(&self) -> MergeStage {
        self.stage
    }

    /// Path for a file inside the scratch directory.
    pub fn scratch_file(&self, name: &str) -> PathBuf {
        self.scratch_dir.join(name)
    }

    /// Create the scratch directory and the output root.
    pub async fn prepare(&self, config: &PipelineConfig) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        tokio::fs::create_dir_all(&config.output_root).await?;
        Ok(())
    }

    /// Take ownership of a shared path this request has just written.
    pub fn claim(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.claimed.contains(&path) {
            self.claimed.push(path);
        }
    }

    /// Paths removed by this request's scoped cleanup.
    pub fn scoped_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.scratch_dir.clone(), self.artifact_path.clone()];
        paths.extend(self.claimed.iter().cloned());
        paths
    }

    /// Move to `next`, recording how long the current stage took.
    pub fn advance(&mut self, next: MergeStage) {
        if !self.stage.can_advance_to(next) {
            warn!(
                request_id = %self.id,
                from = %self.stage,
                to = %next,
                "Unexpected stage transition"
            );
        }
        metrics::record_stage_duration(self.stage, self.stage_started.elapsed());
        debug!(request_id = %self.id, from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
        self.stage_started = Instant::now();
    }
}
