//! FFmpeg filter fragments used by the merge graph.

use crate::clip::Canvas;

/// Sample rate of every audio stream entering a mix or concat.
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Reset timestamps after a trim.
pub const ASETPTS_RESET: &str = "asetpts=PTS-STARTPTS";

/// Reset video timestamps.
pub const SETPTS_RESET: &str = "setpts=PTS-STARTPTS";

/// Keep `[0, seconds)` of an audio stream.
pub fn atrim(seconds: f64) -> String {
    format!("atrim=start=0:end={:.6}", seconds)
}

/// Linear gain.
pub fn volume(gain: f64) -> String {
    format!("volume={:.6}", gain)
}

/// Common sample format so streams can be concatenated and mixed.
pub fn aformat_stereo() -> String {
    format!(
        "aformat=sample_fmts=fltp:sample_rates={}:channel_layouts=stereo",
        AUDIO_SAMPLE_RATE
    )
}

/// Silent stereo source for the `lavfi` input format.
pub fn anullsrc() -> String {
    format!(
        "anullsrc=channel_layout=stereo:sample_rate={}",
        AUDIO_SAMPLE_RATE
    )
}

/// Fit a clip into `canvas` keeping its aspect ratio, padding the rest.
pub fn fit_to_canvas(canvas: Canvas) -> String {
    let (w, h) = even_dimensions(canvas.width, canvas.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={:.3},format=yuv420p",
        canvas.fps
    )
}

/// Join `segments` in order; each segment supplies one video and, when
/// `with_audio`, one audio pad.
pub fn concat(segments: usize, with_audio: bool) -> String {
    format!("concat=n={}:v=1:a={}", segments, u8::from(with_audio))
}

/// Additive mix: samples are summed without level normalisation.
pub fn amix(inputs: usize) -> String {
    format!(
        "amix=inputs={}:duration=longest:dropout_transition=0:normalize=0",
        inputs
    )
}

/// yuv420p needs even frame dimensions.
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    let even = |v: u32| (v - v % 2).max(2);
    (even(width), even(height))
}
