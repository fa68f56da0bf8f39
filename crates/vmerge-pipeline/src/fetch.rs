//! Streamed retrieval of remote sources into a request's scratch directory.

use futures_util::{stream, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use vmerge_media::{MediaError, MediaToolkit};

use crate::config::PipelineConfig;
use crate::error::{MergeError, MergeResult};
use crate::metrics;

/// Extensions that are probed for a video stream after download.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "mkv", "webm", "avi"];

/// Why a single download failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("could not write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("downloaded file is empty")]
    Empty,

    #[error("no video stream found")]
    NoVideoStream,

    #[error("could not probe file: {0}")]
    Probe(MediaError),
}

impl FetchError {
    /// The bytes arrived but are not usable media.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FetchError::Empty | FetchError::NoVideoStream | FetchError::Probe(_)
        )
    }

    /// Attach the failing source to form a request-level error.
    pub fn into_merge_error(self, what: &str, url: &str) -> MergeError {
        let message = format!("Failed to download {what} from {url}: {self}");
        if self.is_validation() {
            MergeError::Validation(message)
        } else {
            MergeError::Fetch(message)
        }
    }
}

/// Single-attempt HTTP downloader.
///
/// There is no retry here: any failure is final for the request.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    toolkit: Arc<dyn MediaToolkit>,
    size_tolerance: u64,
    max_parallel: usize,
}

impl Fetcher {
    pub fn new(config: &PipelineConfig, toolkit: Arc<dyn MediaToolkit>) -> MergeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| MergeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            toolkit,
            size_tolerance: config.fetch_size_tolerance,
            max_parallel: config.max_download_parallel.max(1),
        })
    }

    /// Stream `url` into `dest` and validate the result.
    ///
    /// A partially written `dest` may remain on failure.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        debug!(url = %url, dest = %dest.display(), "Fetching");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let expected = response.content_length();

        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if written == 0 {
            return Err(FetchError::Empty);
        }

        if let Some(expected) = expected {
            if exceeds_tolerance(expected, written, self.size_tolerance) {
                warn!(
                    url = %url,
                    expected,
                    written,
                    "Downloaded size differs from Content-Length"
                );
            }
        }

        if is_video_path(dest) {
            let has_video = self
                .toolkit
                .has_video_stream(dest)
                .await
                .map_err(FetchError::Probe)?;
            if !has_video {
                return Err(FetchError::NoVideoStream);
            }
        }

        metrics::record_fetched_bytes(written);
        debug!(url = %url, bytes = written, "Fetched");
        Ok(written)
    }

    /// Download every video into `dir` as `video_{i}.mp4`.
    ///
    /// Downloads run concurrently but paths come back in input order. The
    /// first failure (in input order) aborts the whole batch.
    pub async fn fetch_videos(&self, urls: &[String], dir: &Path) -> MergeResult<Vec<PathBuf>> {
        let jobs: Vec<(usize, String, PathBuf)> = urls
            .iter()
            .enumerate()
            .map(|(index, url)| (index, url.clone(), dir.join(format!("video_{index}.mp4"))))
            .collect();

        let paths = stream::iter(jobs)
            .map(|(index, url, dest)| async move {
                self.fetch(&url, &dest)
                    .await
                    .map(|_| dest)
                    .map_err(|e| e.into_merge_error(&format!("video {}", index + 1), &url))
            })
            .buffered(self.max_parallel)
            .try_collect::<Vec<_>>()
            .await?;

        info!(count = paths.len(), "Fetched all videos");
        Ok(paths)
    }

    /// Download the background track into `dir`.
    pub async fn fetch_background(&self, url: &str, dir: &Path) -> MergeResult<PathBuf> {
        let dest = dir.join("background.mp3");
        self.fetch(url, &dest)
            .await
            .map_err(|e| e.into_merge_error("background audio", url))?;
        Ok(dest)
    }
}

fn exceeds_tolerance(expected: u64, written: u64, tolerance: u64) -> bool {
    expected.abs_diff(written) > tolerance
}

fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(e)))
}
