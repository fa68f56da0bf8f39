//! End-to-end merges against the real FFmpeg binaries.
//!
//! Inputs are synthesised with `lavfi` sources, so no fixtures are needed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::process::Command;
use vmerge_media::{probe_media, AssemblyInputs, Exporter, FfmpegToolkit, MediaAssembler};

async fn ffmpeg(args: &[&str]) {
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error"])
        .args(args)
        .status()
        .await
        .unwrap();
    assert!(status.success(), "ffmpeg {:?} failed", args);
}

async fn make_clip(dir: &Path, name: &str, seconds: f64, with_audio: bool) -> PathBuf {
    let path = dir.join(name);
    let video = format!("testsrc=duration={seconds}:size=320x240:rate=25");
    let audio = format!("sine=frequency=440:duration={seconds}");
    let out = path.to_string_lossy().to_string();

    if with_audio {
        ffmpeg(&[
            "-f", "lavfi", "-i", &video, "-f", "lavfi", "-i", &audio, "-c:v", "libx264",
            "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest", &out,
        ])
        .await;
    } else {
        ffmpeg(&["-f", "lavfi", "-i", &video, "-c:v", "libx264", "-pix_fmt", "yuv420p", &out]).await;
    }
    path
}

async fn make_tone(dir: &Path, name: &str, seconds: f64) -> PathBuf {
    let path = dir.join(name);
    let source = format!("sine=frequency=330:duration={seconds}");
    ffmpeg(&["-f", "lavfi", "-i", &source, "-c:a", "libmp3lame", &path.to_string_lossy()]).await;
    path
}

async fn merge(dir: &Path, inputs: AssemblyInputs, output: &str) -> PathBuf {
    let toolkit = Arc::new(FfmpegToolkit::new());
    let timeline = MediaAssembler::new(toolkit.clone())
        .assemble(&inputs)
        .await
        .unwrap();
    let output = dir.join(output);
    Exporter::new(toolkit, dir.join("final_merged_video.mp4"))
        .export(&timeline, &output, None)
        .await
        .unwrap();
    output
}

async fn audio_stream_duration(path: &Path) -> f64 {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "a:0", "-show_entries", "stream=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(path)
        .output()
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&output.stdout);
    text.trim()
        .parse()
        .unwrap_or_else(|_| panic!("no audio stream duration in {text:?}"))
}

async fn max_volume_db(path: &Path) -> f64 {
    max_volume_db_from(path, 0.0).await
}

/// Peak level of the audio from `start` seconds onwards.
async fn max_volume_db_from(path: &Path, start: f64) -> f64 {
    let output = Command::new("ffmpeg")
        .args(["-v", "info", "-ss", &format!("{start:.3}"), "-i"])
        .arg(path)
        .args(["-af", "volumedetect", "-vn", "-f", "null", "-"])
        .output()
        .await
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .find_map(|line| {
            let (_, rest) = line.split_once("max_volume:")?;
            rest.trim().trim_end_matches("dB").trim().parse().ok()
        })
        .expect("volumedetect reported no max_volume")
}

fn inputs(dir: &Path, videos: Vec<PathBuf>) -> AssemblyInputs {
    AssemblyInputs {
        videos,
        background: None,
        narration: None,
        background_volume: 1.0,
        work_dir: dir.to_path_buf(),
    }
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_merged_duration_is_sum_of_clips() {
    let dir = TempDir::new().unwrap();
    let videos = vec![
        make_clip(dir.path(), "video_0.mp4", 2.0, true).await,
        make_clip(dir.path(), "video_1.mp4", 1.0, false).await,
        make_clip(dir.path(), "video_2.mp4", 3.0, true).await,
    ];

    let output = merge(dir.path(), inputs(dir.path(), videos), "merged.mp4").await;
    let info = probe_media(&output).await.unwrap();

    assert!((info.duration - 6.0).abs() < 0.15, "duration {}", info.duration);
    assert!(info.has_audio);
    assert!(dir.path().join("final_merged_video.mp4").exists());
    assert!(!dir.path().join("merge_filter.txt").exists());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_short_background_is_looped_to_video_length() {
    let dir = TempDir::new().unwrap();
    let mut request = inputs(dir.path(), vec![make_clip(dir.path(), "video_0.mp4", 5.0, false).await]);
    request.background = Some(make_tone(dir.path(), "background.mp3", 1.5).await);

    let output = merge(dir.path(), request, "looped.mp4").await;

    let audio = audio_stream_duration(&output).await;
    assert!((audio - 5.0).abs() < 0.15, "audio duration {audio}");

    // The tone keeps playing past its own 1.5 s length
    let tail_db = max_volume_db_from(&output, 4.0).await;
    assert!(tail_db > -30.0, "tail peak {tail_db} dB");
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_long_background_is_truncated_to_video_length() {
    let dir = TempDir::new().unwrap();
    let mut request = inputs(dir.path(), vec![make_clip(dir.path(), "video_0.mp4", 2.0, false).await]);
    request.background = Some(make_tone(dir.path(), "background.mp3", 6.0).await);

    let output = merge(dir.path(), request, "trimmed.mp4").await;

    let audio = audio_stream_duration(&output).await;
    assert!((audio - 2.0).abs() < 0.15, "audio duration {audio}");
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_long_narration_is_truncated() {
    let dir = TempDir::new().unwrap();
    let mut request = inputs(dir.path(), vec![make_clip(dir.path(), "video_0.mp4", 2.0, true).await]);
    request.narration = Some(make_tone(dir.path(), "narration.mp3", 6.0).await);

    let output = merge(dir.path(), request, "narrated.mp4").await;
    let audio = audio_stream_duration(&output).await;

    assert!((audio - 2.0).abs() < 0.15, "audio duration {audio}");
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_half_volume_halves_peak_amplitude() {
    let dir = TempDir::new().unwrap();
    let clip = make_clip(dir.path(), "video_0.mp4", 3.0, false).await;
    let tone = make_tone(dir.path(), "background.mp3", 3.0).await;

    let mut full = inputs(dir.path(), vec![clip.clone()]);
    full.background = Some(tone.clone());
    let mut half = full.clone();
    half.background_volume = 0.5;

    let full_db = max_volume_db(&merge(dir.path(), full, "full.mp4").await).await;
    let half_db = max_volume_db(&merge(dir.path(), half, "half.mp4").await).await;

    // Halving amplitude is a drop of 20*log10(2) dB
    let drop = full_db - half_db;
    assert!((drop - 6.02).abs() < 0.7, "peak drop {drop} dB");
}
