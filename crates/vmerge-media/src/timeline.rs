//! Assembled timeline and its rendering into a single FFmpeg invocation.

use std::path::{Path, PathBuf};

use crate::audio::ConformedTrack;
use crate::clip::{Canvas, VideoClip};
use crate::error::{MediaError, MediaResult};
use crate::filters;

/// Audio of the final artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineAudio {
    /// Keep each clip's own audio; clips without audio contribute silence
    Original,
    /// No clip carries audio and no track was supplied
    Silent,
    /// Conformed tracks summed together, replacing the clips' audio
    Mixed(Vec<ConformedTrack>),
}

/// Clips in playback order plus the audio decision, ready to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTimeline {
    clips: Vec<VideoClip>,
    canvas: Canvas,
    audio: TimelineAudio,
    duration: f64,
    script_path: PathBuf,
}

impl AssembledTimeline {
    /// Build a timeline; the first clip fixes the output canvas.
    pub fn new(
        clips: Vec<VideoClip>,
        tracks: Vec<ConformedTrack>,
        script_path: impl AsRef<Path>,
    ) -> MediaResult<Self> {
        let canvas = clips
            .first()
            .map(VideoClip::canvas)
            .ok_or_else(|| MediaError::concatenation("no clips to concatenate"))?;

        let duration: f64 = clips.iter().map(VideoClip::duration).sum();

        let audio = if !tracks.is_empty() {
            TimelineAudio::Mixed(tracks)
        } else if clips.iter().any(VideoClip::has_audio) {
            TimelineAudio::Original
        } else {
            TimelineAudio::Silent
        };

        Ok(Self {
            clips,
            canvas,
            audio,
            duration,
            script_path: script_path.as_ref().to_path_buf(),
        })
    }

    pub fn clips(&self) -> &[VideoClip] {
        &self.clips
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn audio(&self) -> &TimelineAudio {
        &self.audio
    }

    /// Sum of clip durations.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Where the filter graph script is written for encoding.
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Render the timeline into inputs, a filter graph and output maps.
    pub fn render(&self) -> EncodeJob {
        let mut inputs: Vec<EncodeInput> = self
            .clips
            .iter()
            .map(|clip| EncodeInput::File(clip.path().to_path_buf()))
            .collect();
        let mut graph = Vec::new();

        let fit = filters::fit_to_canvas(self.canvas);
        for (i, _) in self.clips.iter().enumerate() {
            graph.push(format!("[{i}:v]{fit},{}[v{i}]", filters::SETPTS_RESET));
        }

        let mut maps = vec!["[vout]".to_string()];

        match &self.audio {
            TimelineAudio::Original => {
                let aformat = filters::aformat_stereo();
                let mut pads = String::new();
                for (i, clip) in self.clips.iter().enumerate() {
                    let d = clip.duration();
                    let source = if clip.has_audio() {
                        i
                    } else {
                        inputs.push(EncodeInput::Silence(d));
                        inputs.len() - 1
                    };
                    // Each segment's audio is cut or padded to its video length
                    graph.push(format!(
                        "[{source}:a]{},{},{aformat},apad=whole_dur={:.6}[a{i}]",
                        filters::atrim(d),
                        filters::ASETPTS_RESET,
                        d
                    ));
                    pads.push_str(&format!("[v{i}][a{i}]"));
                }
                graph.push(format!(
                    "{pads}{}[vout][aout]",
                    filters::concat(self.clips.len(), true)
                ));
                maps.push("[aout]".to_string());
            }
            TimelineAudio::Silent => {
                graph.push(self.video_concat());
            }
            TimelineAudio::Mixed(tracks) => {
                graph.push(self.video_concat());

                let mut labels = Vec::with_capacity(tracks.len());
                for (j, track) in tracks.iter().enumerate() {
                    let path = track.track().path().to_path_buf();
                    inputs.push(if track.needs_looped_input() {
                        EncodeInput::Looped(path)
                    } else {
                        EncodeInput::File(path)
                    });
                    let label = if tracks.len() == 1 {
                        "aout".to_string()
                    } else {
                        format!("t{j}")
                    };
                    graph.push(track.filter_chain(inputs.len() - 1, &label));
                    labels.push(label);
                }

                if tracks.len() > 1 {
                    let pads: String = labels.iter().map(|l| format!("[{l}]")).collect();
                    graph.push(format!("{pads}{}[aout]", filters::amix(tracks.len())));
                }
                maps.push("[aout]".to_string());
            }
        }

        EncodeJob {
            inputs,
            filter_graph: graph.join(";\n"),
            maps,
            duration: self.duration,
            script_path: self.script_path.clone(),
        }
    }

    fn video_concat(&self) -> String {
        let pads: String = (0..self.clips.len()).map(|i| format!("[v{i}]")).collect();
        format!("{pads}{}[vout]", filters::concat(self.clips.len(), false))
    }
}

/// One input of an encode job, in `-i` order.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeInput {
    File(PathBuf),
    /// Repeated endlessly; bounded by a trim in the graph
    Looped(PathBuf),
    /// Synthetic silence of the given length
    Silence(f64),
}

/// Everything needed to encode a timeline in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub inputs: Vec<EncodeInput>,
    pub filter_graph: String,
    pub maps: Vec<String>,
    /// Target duration in seconds
    pub duration: f64,
    pub script_path: PathBuf,
}

impl EncodeJob {
    pub fn has_audio(&self) -> bool {
        self.maps.iter().any(|m| m == "[aout]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{AudioRole, AudioTrack};
    use crate::probe::MediaInfo;

    fn clip(position: usize, duration: f64, has_audio: bool) -> VideoClip {
        let info = MediaInfo {
            duration,
            width: 640,
            height: 360,
            fps: 25.0,
            has_video: true,
            has_audio,
        };
        VideoClip::from_info(format!("video_{}.mp4", position - 1), position, info).unwrap()
    }

    fn track(path: &str, role: AudioRole, duration: f64) -> AudioTrack {
        let info = MediaInfo {
            duration,
            width: 0,
            height: 0,
            fps: 0.0,
            has_video: false,
            has_audio: true,
        };
        AudioTrack::from_info(path, role, &info).unwrap()
    }

    #[test]
    fn test_empty_timeline_is_a_concat_error() {
        let err = AssembledTimeline::new(vec![], vec![], "f.txt").unwrap_err();
        assert!(matches!(err, MediaError::Concatenation(_)));
    }

    #[test]
    fn test_duration_is_sum_of_clips() {
        let timeline = AssembledTimeline::new(
            vec![clip(1, 2.0, true), clip(2, 3.5, true), clip(3, 1.25, true)],
            vec![],
            "f.txt",
        )
        .unwrap();
        assert!((timeline.duration() - 6.75).abs() < 1e-9);
        assert_eq!(timeline.audio(), &TimelineAudio::Original);
    }

    #[test]
    fn test_clips_concatenate_in_input_order() {
        let timeline =
            AssembledTimeline::new(vec![clip(1, 2.0, false), clip(2, 3.0, false)], vec![], "f.txt")
                .unwrap();
        let job = timeline.render();

        assert_eq!(timeline.audio(), &TimelineAudio::Silent);
        assert_eq!(
            job.inputs,
            vec![
                EncodeInput::File("video_0.mp4".into()),
                EncodeInput::File("video_1.mp4".into())
            ]
        );
        assert!(job.filter_graph.contains("[v0][v1]concat=n=2:v=1:a=0[vout]"));
        assert!(!job.has_audio());
    }

    #[test]
    fn test_missing_clip_audio_is_filled_with_silence() {
        let timeline =
            AssembledTimeline::new(vec![clip(1, 2.0, true), clip(2, 3.0, false)], vec![], "f.txt")
                .unwrap();
        let job = timeline.render();

        assert_eq!(job.inputs[2], EncodeInput::Silence(3.0));
        assert!(job.filter_graph.contains("[2:a]atrim"));
        assert!(job.filter_graph.contains("[v0][a0][v1][a1]concat=n=2:v=1:a=1[vout][aout]"));
        assert!(job.has_audio());
    }

    #[test]
    fn test_tracks_replace_original_audio() {
        let bg = ConformedTrack::background(track("background.mp3", AudioRole::Background, 2.0), 5.0, 0.5);
        let narration =
            ConformedTrack::narration(track("narration.mp3", AudioRole::Narration, 9.0), 5.0);

        let timeline = AssembledTimeline::new(
            vec![clip(1, 2.0, true), clip(2, 3.0, true)],
            vec![bg, narration],
            "f.txt",
        )
        .unwrap();
        let job = timeline.render();

        assert_eq!(job.inputs[2], EncodeInput::Looped("background.mp3".into()));
        assert_eq!(job.inputs[3], EncodeInput::File("narration.mp3".into()));
        assert!(!job.filter_graph.contains("[0:a]"));
        assert!(job.filter_graph.contains("[t0][t1]amix=inputs=2"));
        assert_eq!(job.maps, vec!["[vout]", "[aout]"]);
    }

    #[test]
    fn test_single_track_feeds_output_directly() {
        let bg = ConformedTrack::background(track("background.mp3", AudioRole::Background, 9.0), 2.0, 1.0);
        let timeline = AssembledTimeline::new(vec![clip(1, 2.0, false)], vec![bg], "f.txt").unwrap();
        let job = timeline.render();

        assert!(job.filter_graph.contains("[1:a]atrim=start=0:end=2.000000"));
        assert!(job.filter_graph.contains("[aout]"));
        assert!(!job.filter_graph.contains("amix"));
    }
}
