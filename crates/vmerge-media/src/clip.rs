//! Loaded media sources.
//!
//! A [`VideoClip`] or [`AudioTrack`] is a local file whose metadata has been
//! probed and checked; nothing here decodes frames.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};
use crate::probe::MediaInfo;

/// Frame geometry shared by every clip of a timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl Canvas {
    /// Frame rate used when the first clip does not report one.
    pub const FALLBACK_FPS: f64 = 30.0;
}

/// A video source with validated duration and geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoClip {
    path: PathBuf,
    /// One-based position in the requested order
    position: usize,
    info: MediaInfo,
}

impl VideoClip {
    /// Accept probed metadata for the clip at one-based `position`.
    pub fn from_info(path: impl AsRef<Path>, position: usize, info: MediaInfo) -> MediaResult<Self> {
        if !info.has_video {
            return Err(MediaError::clip_load(position, "no video stream"));
        }
        if !(info.duration > 0.0) {
            return Err(MediaError::clip_load(
                position,
                format!("non-positive duration {}", info.duration),
            ));
        }
        if info.width == 0 || info.height == 0 {
            return Err(MediaError::clip_load(
                position,
                format!("invalid frame size {}x{}", info.width, info.height),
            ));
        }

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            position,
            info,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    pub fn has_audio(&self) -> bool {
        self.info.has_audio
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.info.width,
            height: self.info.height,
            fps: if self.info.fps > 0.0 {
                self.info.fps
            } else {
                Canvas::FALLBACK_FPS
            },
        }
    }
}

/// What an audio track is used for in the final mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRole {
    /// Looped or trimmed to the video length, then scaled by the request volume
    Background,
    /// Truncated to the video length, never looped
    Narration,
}

impl AudioRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioRole::Background => "background",
            AudioRole::Narration => "narration",
        }
    }
}

/// An audio source with a known, positive duration.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    path: PathBuf,
    role: AudioRole,
    duration: f64,
}

impl AudioTrack {
    pub fn from_info(path: impl AsRef<Path>, role: AudioRole, info: &MediaInfo) -> MediaResult<Self> {
        if !info.has_audio {
            return Err(MediaError::audio(format!(
                "{} track {} has no audio stream",
                role.as_str(),
                path.as_ref().display()
            )));
        }
        if !(info.duration > 0.0) {
            return Err(MediaError::audio(format!(
                "{} track {} has no measurable duration",
                role.as_str(),
                path.as_ref().display()
            )));
        }

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            role,
            duration: info.duration,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> AudioRole {
        self.role
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(duration: f64, width: u32, height: u32) -> MediaInfo {
        MediaInfo {
            duration,
            width,
            height,
            fps: 0.0,
            has_video: true,
            has_audio: false,
        }
    }

    #[test]
    fn test_clip_rejects_bad_geometry_and_duration() {
        let err = VideoClip::from_info("a.mp4", 2, video(0.0, 640, 360)).unwrap_err();
        assert_eq!(err.to_string(), "Failed to load video 2: non-positive duration 0");

        let err = VideoClip::from_info("a.mp4", 1, video(3.0, 0, 360)).unwrap_err();
        assert!(matches!(err, MediaError::ClipLoad { position: 1, .. }));

        let err = VideoClip::from_info("a.mp4", 1, video(f64::NAN, 640, 360)).unwrap_err();
        assert!(matches!(err, MediaError::ClipLoad { .. }));
    }

    #[test]
    fn test_canvas_falls_back_to_default_fps() {
        let clip = VideoClip::from_info("a.mp4", 1, video(3.0, 640, 360)).unwrap();
        assert_eq!(clip.canvas().fps, Canvas::FALLBACK_FPS);
        assert_eq!((clip.canvas().width, clip.canvas().height), (640, 360));
    }

    #[test]
    fn test_track_requires_audio() {
        let info = video(3.0, 640, 360);
        let err = AudioTrack::from_info("bg.mp3", AudioRole::Background, &info).unwrap_err();
        assert!(matches!(err, MediaError::AudioProcessing(_)));
    }
}
