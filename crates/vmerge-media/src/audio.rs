//! Audio conforming and mixing decisions.

use crate::clip::{AudioRole, AudioTrack};
use crate::filters;

/// Durations closer than this are treated as equal.
const DURATION_EPSILON: f64 = 1e-3;

/// How a track is brought to the target duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConformPlan {
    /// Already the right length (or a shorter narration)
    AsIs,
    /// Repeat from the start until the target is covered, then trim
    Loop,
    /// Cut to the target from the start
    Truncate,
}

impl ConformPlan {
    /// Background: always ends up exactly `target` long.
    pub fn for_background(source: f64, target: f64) -> Self {
        if source + DURATION_EPSILON < target {
            ConformPlan::Loop
        } else if source > target + DURATION_EPSILON {
            ConformPlan::Truncate
        } else {
            ConformPlan::AsIs
        }
    }

    /// Narration: truncated when longer, never extended.
    pub fn for_narration(source: f64, target: f64) -> Self {
        if source > target + DURATION_EPSILON {
            ConformPlan::Truncate
        } else {
            ConformPlan::AsIs
        }
    }
}

/// A track together with the plan that conforms it to the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformedTrack {
    track: AudioTrack,
    plan: ConformPlan,
    target: f64,
    gain: f64,
}

impl ConformedTrack {
    /// Conform a background track and scale it by the linear `volume`.
    pub fn background(track: AudioTrack, target: f64, volume: f64) -> Self {
        let plan = ConformPlan::for_background(track.duration(), target);
        Self {
            track,
            plan,
            target,
            gain: volume,
        }
    }

    /// Conform a narration track; its level is left untouched.
    pub fn narration(track: AudioTrack, target: f64) -> Self {
        let plan = ConformPlan::for_narration(track.duration(), target);
        Self {
            track,
            plan,
            target,
            gain: 1.0,
        }
    }

    /// Conform according to the track's role.
    pub fn for_role(track: AudioTrack, target: f64, volume: f64) -> Self {
        match track.role() {
            AudioRole::Background => Self::background(track, target, volume),
            AudioRole::Narration => Self::narration(track, target),
        }
    }

    pub fn track(&self) -> &AudioTrack {
        &self.track
    }

    pub fn plan(&self) -> ConformPlan {
        self.plan
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Whether the input must be opened with endless looping.
    pub fn needs_looped_input(&self) -> bool {
        self.plan == ConformPlan::Loop
    }

    /// Length of the track once conformed.
    pub fn conformed_duration(&self) -> f64 {
        match self.plan {
            ConformPlan::Loop | ConformPlan::Truncate => self.target,
            ConformPlan::AsIs => match self.track.role() {
                AudioRole::Background => self.target,
                AudioRole::Narration => self.track.duration().min(self.target),
            },
        }
    }

    /// Filter chain turning input `input` into label `output`.
    ///
    /// Every chain is trimmed to the target, which is what bounds a looped
    /// input and truncates a long one.
    pub fn filter_chain(&self, input: usize, output: &str) -> String {
        let mut chain = vec![
            filters::atrim(self.target),
            filters::ASETPTS_RESET.to_string(),
            filters::aformat_stereo(),
        ];
        if (self.gain - 1.0).abs() > f64::EPSILON {
            chain.push(filters::volume(self.gain));
        }
        format!("[{input}:a]{}[{output}]", chain.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MediaInfo;

    fn track(role: AudioRole, duration: f64) -> AudioTrack {
        let info = MediaInfo {
            duration,
            width: 0,
            height: 0,
            fps: 0.0,
            has_video: false,
            has_audio: true,
        };
        AudioTrack::from_info("track.mp3", role, &info).unwrap()
    }

    #[test]
    fn test_background_plans() {
        assert_eq!(ConformPlan::for_background(3.0, 10.0), ConformPlan::Loop);
        assert_eq!(ConformPlan::for_background(30.0, 10.0), ConformPlan::Truncate);
        assert_eq!(ConformPlan::for_background(10.0, 10.0), ConformPlan::AsIs);
    }

    #[test]
    fn test_narration_never_loops() {
        assert_eq!(ConformPlan::for_narration(3.0, 10.0), ConformPlan::AsIs);
        assert_eq!(ConformPlan::for_narration(12.0, 10.0), ConformPlan::Truncate);

        let short = ConformedTrack::narration(track(AudioRole::Narration, 3.0), 10.0);
        assert!(!short.needs_looped_input());
        assert!((short.conformed_duration() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_background_always_reaches_target() {
        let looped = ConformedTrack::background(track(AudioRole::Background, 3.0), 10.0, 0.5);
        assert!(looped.needs_looped_input());
        assert!((looped.conformed_duration() - 10.0).abs() < 1e-9);

        let cut = ConformedTrack::background(track(AudioRole::Background, 40.0), 10.0, 0.5);
        assert!(!cut.needs_looped_input());
        assert!((cut.conformed_duration() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_filter_chain_applies_linear_gain() {
        let bg = ConformedTrack::background(track(AudioRole::Background, 3.0), 10.0, 0.5);
        let chain = bg.filter_chain(2, "bg");
        assert!(chain.starts_with("[2:a]atrim=start=0:end=10.000000,asetpts=PTS-STARTPTS"));
        assert!(chain.contains("volume=0.500000"));
        assert!(chain.ends_with("[bg]"));

        let narration = ConformedTrack::narration(track(AudioRole::Narration, 3.0), 10.0);
        assert!(!narration.filter_chain(3, "nar").contains("volume="));
    }

    #[test]
    fn test_negative_volume_passes_through() {
        let bg = ConformedTrack::background(track(AudioRole::Background, 3.0), 10.0, -0.25);
        assert!(bg.filter_chain(1, "bg").contains("volume=-0.250000"));
    }
}
