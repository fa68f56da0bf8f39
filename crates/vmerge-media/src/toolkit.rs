//! The media toolkit seam.
//!
//! [`MediaAssembler`](crate::MediaAssembler) and [`Exporter`](crate::Exporter)
//! only talk to media through this trait; [`FfmpegToolkit`] is the production
//! implementation over the FFmpeg CLI.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::clip::{AudioRole, AudioTrack, VideoClip};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters;
use crate::probe::{probe_media, MediaInfo};
use crate::progress::ProgressCallback;
use crate::timeline::{EncodeInput, EncodeJob};

/// Probe, load and encode primitives.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Inspect a local media file.
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    /// Encode `job` into `output`, reporting raw progress.
    async fn encode(
        &self,
        job: &EncodeJob,
        output: &Path,
        on_progress: ProgressCallback,
    ) -> MediaResult<()>;

    /// Whether the file holds at least one decodable video stream.
    async fn has_video_stream(&self, path: &Path) -> MediaResult<bool> {
        Ok(self.probe(path).await?.has_video)
    }

    /// Load the clip at one-based `position`.
    async fn load_video(&self, path: &Path, position: usize) -> MediaResult<VideoClip> {
        let info = self
            .probe(path)
            .await
            .map_err(|e| MediaError::clip_load(position, e.to_string()))?;
        VideoClip::from_info(path, position, info)
    }

    /// Load an audio track for `role`.
    async fn load_audio(&self, path: &Path, role: AudioRole) -> MediaResult<AudioTrack> {
        let info = self.probe(path).await.map_err(|e| {
            MediaError::audio(format!("could not read {} track: {}", role.as_str(), e))
        })?;
        AudioTrack::from_info(path, role, &info)
    }
}

/// Fixed output encoding.
pub mod encoding {
    pub const VIDEO_CODEC: &str = "libx264";
    pub const PRESET: &str = "medium";
    pub const PIXEL_FORMAT: &str = "yuv420p";
    pub const AUDIO_CODEC: &str = "aac";
    pub const AUDIO_BITRATE: &str = "192k";
}

/// [`MediaToolkit`] backed by the `ffprobe` and `ffmpeg` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegToolkit {
    runner: FfmpegRunner,
}

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill encodes that run longer than `secs`.
    pub fn with_timeout(secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(secs),
        }
    }

    /// Build the encode command for `job`.
    pub fn build_command(job: &EncodeJob, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(output);
        for input in &job.inputs {
            cmd = match input {
                EncodeInput::File(path) => cmd.input(path),
                EncodeInput::Looped(path) => cmd.looped_input(path),
                EncodeInput::Silence(seconds) => cmd.lavfi_input(filters::anullsrc(), *seconds),
            };
        }

        cmd = cmd.filter_complex_script(&job.script_path);
        for map in &job.maps {
            cmd = cmd.map(map.clone());
        }

        cmd = cmd
            .video_codec(encoding::VIDEO_CODEC)
            .preset(encoding::PRESET)
            .pixel_format(encoding::PIXEL_FORMAT);

        if job.has_audio() {
            cmd = cmd
                .audio_codec(encoding::AUDIO_CODEC)
                .audio_bitrate(encoding::AUDIO_BITRATE)
                .audio_sample_rate(filters::AUDIO_SAMPLE_RATE);
        }

        cmd.output_duration(job.duration).faststart()
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(path).await
    }

    async fn encode(
        &self,
        job: &EncodeJob,
        output: &Path,
        on_progress: ProgressCallback,
    ) -> MediaResult<()> {
        if let Some(parent) = job.script_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&job.script_path, &job.filter_graph).await?;
        debug!(script = %job.script_path.display(), "Wrote filter graph script");

        let cmd = Self::build_command(job, output);
        self.runner.run_with_progress(&cmd, on_progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_build_command_uses_fixed_codecs() {
        let job = EncodeJob {
            inputs: vec![
                EncodeInput::File("video_0.mp4".into()),
                EncodeInput::Looped("background.mp3".into()),
            ],
            filter_graph: String::new(),
            maps: vec!["[vout]".into(), "[aout]".into()],
            duration: 4.0,
            script_path: PathBuf::from("/tmp/r1/merge_filter.txt"),
        };

        let args = FfmpegToolkit::build_command(&job, Path::new("out.mp4")).build_args();
        let joined = args.join(" ");

        assert!(joined.contains("-stream_loop -1 -i background.mp3"));
        assert!(joined.contains("-filter_complex_script /tmp/r1/merge_filter.txt"));
        assert!(joined.contains("-map [vout] -map [aout]"));
        assert!(joined.contains("-c:v libx264 -preset medium -pix_fmt yuv420p"));
        assert!(joined.contains("-c:a aac -b:a 192k -ar 44100"));
        assert!(joined.contains("-movflags +faststart"));
    }

    #[test]
    fn test_video_only_job_has_no_audio_codec() {
        let job = EncodeJob {
            inputs: vec![EncodeInput::File("video_0.mp4".into())],
            filter_graph: String::new(),
            maps: vec!["[vout]".into()],
            duration: 2.0,
            script_path: PathBuf::from("f.txt"),
        };

        let args = FfmpegToolkit::build_command(&job, Path::new("out.mp4")).build_args();
        assert!(!args.contains(&"-c:a".to_string()));
    }
}
