#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for merging clips.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Stream probing through FFprobe
//! - Clip loading, in-order concatenation and audio conform/mix planning
//! - Export with output verification and a recovery copy

pub mod assemble;
pub mod audio;
pub mod clip;
pub mod command;
pub mod error;
pub mod export;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod timeline;
pub mod toolkit;

pub use assemble::{AssemblyInputs, MediaAssembler, FILTER_SCRIPT_NAME};
pub use audio::{ConformPlan, ConformedTrack};
pub use clip::{AudioRole, AudioTrack, Canvas, VideoClip};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use export::{ExportReport, Exporter};
pub use probe::{has_video_stream, parse_probe_output, probe_media, MediaInfo};
pub use progress::{FfmpegProgress, PercentCallback, PercentTracker, ProgressCallback};
pub use timeline::{AssembledTimeline, EncodeInput, EncodeJob, TimelineAudio};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
