//! Loading sources and building the merge timeline.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::audio::ConformedTrack;
use crate::clip::AudioRole;
use crate::error::{MediaError, MediaResult};
use crate::timeline::AssembledTimeline;
use crate::toolkit::MediaToolkit;

/// File name of the filter graph script inside the work directory.
pub const FILTER_SCRIPT_NAME: &str = "merge_filter.txt";

/// Local sources for one merge.
#[derive(Debug, Clone)]
pub struct AssemblyInputs {
    /// Video files in playback order
    pub videos: Vec<PathBuf>,
    pub background: Option<PathBuf>,
    pub narration: Option<PathBuf>,
    /// Linear gain for the background track
    pub background_volume: f64,
    /// Request-owned directory for intermediate files
    pub work_dir: PathBuf,
}

/// Loads clips and tracks and decides how they combine.
#[derive(Clone)]
pub struct MediaAssembler {
    toolkit: Arc<dyn MediaToolkit>,
}

impl MediaAssembler {
    pub fn new(toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self { toolkit }
    }

    pub async fn assemble(&self, inputs: &AssemblyInputs) -> MediaResult<AssembledTimeline> {
        if inputs.videos.is_empty() {
            return Err(MediaError::concatenation("no clips to concatenate"));
        }

        let mut clips = Vec::with_capacity(inputs.videos.len());
        for (index, path) in inputs.videos.iter().enumerate() {
            let clip = self.toolkit.load_video(path, index + 1).await?;
            debug!(
                position = clip.position(),
                duration = clip.duration(),
                has_audio = clip.has_audio(),
                "Loaded clip"
            );
            clips.push(clip);
        }

        let target: f64 = clips.iter().map(|c| c.duration()).sum();

        let mut tracks = Vec::new();
        if let Some(path) = &inputs.background {
            let track = self.toolkit.load_audio(path, AudioRole::Background).await?;
            tracks.push(ConformedTrack::for_role(track, target, inputs.background_volume));
        }
        if let Some(path) = &inputs.narration {
            let track = self.toolkit.load_audio(path, AudioRole::Narration).await?;
            tracks.push(ConformedTrack::for_role(track, target, inputs.background_volume));
        }

        for track in &tracks {
            debug!(
                role = track.track().role().as_str(),
                source_duration = track.track().duration(),
                plan = ?track.plan(),
                gain = track.gain(),
                "Conformed audio track"
            );
        }

        let timeline =
            AssembledTimeline::new(clips, tracks, inputs.work_dir.join(FILTER_SCRIPT_NAME))?;

        info!(
            clips = timeline.clips().len(),
            duration = timeline.duration(),
            "Assembled timeline"
        );

        Ok(timeline)
    }
}
