//! Deferred cleanup dispatch.
//!
//! Jobs are handed to a single background worker through an unbounded
//! channel. Callers enqueue only after their response has been built; the
//! worker never sees a job earlier than that.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::janitor::{CleanupJob, CleanupReport, Janitor};

struct QueuedJob {
    job: CleanupJob,
    done: oneshot::Sender<CleanupReport>,
}

/// Sender side of the cleanup worker.
#[derive(Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
}

/// Completion of one enqueued job. Dropping it does not cancel the job.
#[derive(Debug)]
pub struct CleanupHandle {
    rx: oneshot::Receiver<CleanupReport>,
}

impl CleanupHandle {
    /// Wait for the job; `None` if the worker stopped before running it.
    pub async fn wait(self) -> Option<CleanupReport> {
        self.rx.await.ok()
    }
}

impl CleanupQueue {
    /// Start the worker. It exits once every queue clone is dropped and the
    /// backlog is drained.
    pub fn spawn(janitor: Arc<Janitor>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedJob>();

        let worker = tokio::spawn(async move {
            while let Some(QueuedJob { job, done }) = rx.recv().await {
                let report = janitor.run(&job).await;
                debug!(
                    request_id = %job.request_id(),
                    removed = report.removed.len(),
                    warnings = report.warnings.len(),
                    "Cleanup job finished"
                );
                let _ = done.send(report);
            }
            debug!("Cleanup worker stopped");
        });

        (Self { tx }, worker)
    }

    /// Queue `job` for the background worker.
    pub fn enqueue(&self, job: CleanupJob) -> CleanupHandle {
        let (done, rx) = oneshot::channel();
        let request_id = job.request_id().clone();
        if self.tx.send(QueuedJob { job, done }).is_err() {
            warn!(request_id = %request_id, "Cleanup worker is gone; job dropped");
        }
        CleanupHandle { rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use tempfile::TempDir;
    use vmerge_models::RequestId;

    #[tokio::test]
    async fn test_jobs_run_in_background_and_resolve() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::with_roots(dir.path().join("temp"), dir.path().join("output"));
        let scratch = config.temp_root.join("r1");
        tokio::fs::create_dir_all(&scratch).await.unwrap();

        let (queue, worker) = CleanupQueue::spawn(Arc::new(Janitor::new(&config)));
        let handle = queue.enqueue(CleanupJob::Scoped {
            request_id: RequestId::from_string("r1"),
            paths: vec![scratch.clone()],
        });

        let report = handle.wait().await.unwrap();
        assert_eq!(report.removed, vec![scratch.clone()]);
        assert!(!scratch.exists());

        drop(queue);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_resolves_none() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::with_roots(dir.path().join("temp"), dir.path().join("output"));
        let (queue, worker) = CleanupQueue::spawn(Arc::new(Janitor::new(&config)));
        worker.abort();
        let _ = worker.await;

        let handle = queue.enqueue(CleanupJob::FullPurge {
            request_id: RequestId::from_string("r1"),
        });
        assert!(handle.wait().await.is_none());
    }
}
