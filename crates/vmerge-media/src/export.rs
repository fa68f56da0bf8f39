//! Encoding a timeline into the final artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{copy_atomic, file_size};
use crate::progress::{FfmpegProgress, PercentCallback, PercentTracker};
use crate::timeline::{AssembledTimeline, EncodeJob};
use crate::toolkit::MediaToolkit;

/// A verified artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_secs: f64,
    /// Set when the recovery copy was written
    pub latest_copy: Option<PathBuf>,
}

/// Encodes timelines, verifies the output and refreshes the recovery copy.
#[derive(Clone)]
pub struct Exporter {
    toolkit: Arc<dyn MediaToolkit>,
    latest_path: PathBuf,
}

impl Exporter {
    /// `latest_path` receives a copy of every successful export.
    pub fn new(toolkit: Arc<dyn MediaToolkit>, latest_path: impl Into<PathBuf>) -> Self {
        Self {
            toolkit,
            latest_path: latest_path.into(),
        }
    }

    pub fn latest_path(&self) -> &Path {
        &self.latest_path
    }

    /// Encode `timeline` to `output`.
    ///
    /// `observer` receives strictly increasing whole percentages. Resources
    /// held for the encode are released before returning, whatever the
    /// outcome.
    pub async fn export(
        &self,
        timeline: &AssembledTimeline,
        output: &Path,
        observer: Option<PercentCallback>,
    ) -> MediaResult<ExportReport> {
        let job = timeline.render();
        let result = self.encode_and_verify(&job, output, observer).await;
        self.release(&job).await;
        result
    }

    async fn encode_and_verify(
        &self,
        job: &EncodeJob,
        output: &Path,
        observer: Option<PercentCallback>,
    ) -> MediaResult<ExportReport> {
        let tracker = Arc::new(PercentTracker::new(job.duration));
        let observer = observer.map(Arc::new);

        let report = Arc::new(move |percent: u8| {
            debug!(percent, "Export progress");
            if let Some(observer) = &observer {
                observer(percent);
            }
        });

        let on_progress = {
            let report = Arc::clone(&report);
            let tracker = Arc::clone(&tracker);
            Box::new(move |progress: FfmpegProgress| {
                if let Some(percent) = tracker.observe(&progress) {
                    report(percent);
                }
            })
        };

        let started = Instant::now();
        self.toolkit
            .encode(job, output, on_progress)
            .await
            .map_err(|e| match e {
                MediaError::Export(_) => e,
                other => MediaError::export(format!("encoding failed: {other}")),
            })?;
        metrics::histogram!("vmerge_encode_duration_seconds").record(started.elapsed().as_secs_f64());

        let size_bytes = match file_size(output).await? {
            None => return Err(MediaError::export("output file was not created")),
            Some(0) => return Err(MediaError::export("output file is empty")),
            Some(size) => size,
        };

        if let Some(percent) = tracker.finish() {
            report(percent);
        }

        info!(
            output = %output.display(),
            size_bytes,
            duration = job.duration,
            "Export complete"
        );

        let latest_copy = match copy_atomic(output, &self.latest_path).await {
            Ok(_) => Some(self.latest_path.clone()),
            Err(e) => {
                metrics::counter!("vmerge_latest_copy_failures_total").increment(1);
                warn!(
                    latest = %self.latest_path.display(),
                    error = %e,
                    "Failed to refresh recovery copy"
                );
                None
            }
        };

        Ok(ExportReport {
            path: output.to_path_buf(),
            size_bytes,
            duration_secs: job.duration,
            latest_copy,
        })
    }

    /// Drop encode intermediates; failures are logged only.
    async fn release(&self, job: &EncodeJob) {
        match tokio::fs::remove_file(&job.script_path).await {
            Ok(()) => debug!(script = %job.script_path.display(), "Released filter script"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                script = %job.script_path.display(),
                error = %e,
                "Failed to release filter script"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::VideoClip;
    use crate::probe::MediaInfo;
    use crate::progress::ProgressCallback;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes `payload` to the output and replays scripted progress.
    struct ScriptedToolkit {
        payload: &'static [u8],
        progress_ms: Vec<i64>,
        fail: bool,
    }

    #[async_trait]
    impl MediaToolkit for ScriptedToolkit {
        async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
            Err(MediaError::FileNotFound(path.to_path_buf()))
        }

        async fn encode(
            &self,
            job: &EncodeJob,
            output: &Path,
            on_progress: ProgressCallback,
        ) -> MediaResult<()> {
            tokio::fs::write(&job.script_path, &job.filter_graph).await?;
            for ms in &self.progress_ms {
                on_progress(FfmpegProgress {
                    out_time_ms: *ms,
                    ..Default::default()
                });
            }
            if self.fail {
                return Err(MediaError::ffmpeg_failed("encoder crashed", None, Some(1)));
            }
            tokio::fs::write(output, self.payload).await?;
            Ok(())
        }
    }

    fn timeline(dir: &Path) -> AssembledTimeline {
        let info = MediaInfo {
            duration: 10.0,
            width: 320,
            height: 240,
            fps: 30.0,
            has_video: true,
            has_audio: true,
        };
        let clip = VideoClip::from_info(dir.join("video_0.mp4"), 1, info).unwrap();
        AssembledTimeline::new(vec![clip], vec![], dir.join("merge_filter.txt")).unwrap()
    }

    fn exporter(toolkit: ScriptedToolkit, latest: PathBuf) -> Exporter {
        Exporter::new(Arc::new(toolkit), latest)
    }

    #[tokio::test]
    async fn test_export_reports_monotonic_progress_and_copies_latest() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged_video_r1.mp4");
        let latest = dir.path().join("final_merged_video.mp4");
        let toolkit = ScriptedToolkit {
            payload: b"encoded",
            progress_ms: vec![0, 2500, 1000, 2500, 9000],
            fail: false,
        };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let report = exporter(toolkit, latest.clone())
            .export(
                &timeline(dir.path()),
                &output,
                Some(Box::new(move |p| sink.lock().unwrap().push(p))),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 25, 90, 100]);
        assert_eq!(report.size_bytes, 7);
        assert_eq!(report.latest_copy.as_deref(), Some(latest.as_path()));
        assert_eq!(tokio::fs::read(&latest).await.unwrap(), b"encoded");
        assert!(!dir.path().join("merge_filter.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_output_fails_and_releases() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged_video_r1.mp4");
        let toolkit = ScriptedToolkit {
            payload: b"",
            progress_ms: vec![],
            fail: false,
        };

        let err = exporter(toolkit, dir.path().join("latest.mp4"))
            .export(&timeline(dir.path()), &output, None)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Export(_)));
        assert!(!dir.path().join("latest.mp4").exists());
        assert!(!dir.path().join("merge_filter.txt").exists());
    }

    #[tokio::test]
    async fn test_encoder_failure_is_an_export_error() {
        let dir = TempDir::new().unwrap();
        let toolkit = ScriptedToolkit {
            payload: b"",
            progress_ms: vec![1000],
            fail: true,
        };

        let err = exporter(toolkit, dir.path().join("latest.mp4"))
            .export(&timeline(dir.path()), &dir.path().join("out.mp4"), None)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Export failed: encoding failed"));
        assert!(!dir.path().join("merge_filter.txt").exists());
    }

    #[tokio::test]
    async fn test_latest_copy_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.mp4");
        // A directory in the way makes the final rename fail
        let latest = dir.path().join("blocked");
        tokio::fs::create_dir_all(latest.join("inner")).await.unwrap();

        let toolkit = ScriptedToolkit {
            payload: b"encoded",
            progress_ms: vec![],
            fail: false,
        };

        let report = exporter(toolkit, latest)
            .export(&timeline(dir.path()), &output, None)
            .await
            .unwrap();

        assert!(report.latest_copy.is_none());
        assert_eq!(report.size_bytes, 7);
    }
}
