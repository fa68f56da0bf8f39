//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Calculate progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms.max(0) as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

/// Callback type for raw FFmpeg progress updates.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + 'static>;

/// Callback type for whole-percent export progress.
pub type PercentCallback = Box<dyn Fn(u8) + Send + Sync + 'static>;

/// Turns raw FFmpeg progress into a non-decreasing whole percentage.
///
/// Each percentage is reported at most once; updates that would move
/// backwards or repeat the last value are swallowed.
#[derive(Debug)]
pub struct PercentTracker {
    total_duration_ms: i64,
    last: AtomicU8,
    started: AtomicU8,
}

impl PercentTracker {
    pub fn new(total_duration_secs: f64) -> Self {
        Self {
            total_duration_ms: (total_duration_secs * 1000.0).round() as i64,
            last: AtomicU8::new(0),
            started: AtomicU8::new(0),
        }
    }

    /// Feed one update; returns the percentage to report, if it advanced.
    pub fn observe(&self, progress: &FfmpegProgress) -> Option<u8> {
        let percent = progress.percentage(self.total_duration_ms).floor() as u8;
        self.advance(percent)
    }

    /// Force completion; returns 100 unless it was already reported.
    pub fn finish(&self) -> Option<u8> {
        self.advance(100)
    }

    fn advance(&self, percent: u8) -> Option<u8> {
        let first = self.started.swap(1, Ordering::AcqRel) == 0;
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        if percent > previous || (first && percent == 0) {
            Some(percent)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> FfmpegProgress {
        FfmpegProgress {
            out_time_ms: ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_progress_percentage() {
        assert!((at(5000).percentage(10000) - 50.0).abs() < 0.01);
        assert!((at(5000).percentage(5000) - 100.0).abs() < 0.01);
        assert!((at(-40).percentage(5000)).abs() < 0.01);
    }

    #[test]
    fn test_tracker_is_monotonic() {
        let tracker = PercentTracker::new(10.0);

        assert_eq!(tracker.observe(&at(0)), Some(0));
        assert_eq!(tracker.observe(&at(2500)), Some(25));
        assert_eq!(tracker.observe(&at(2500)), None);
        // A later update reporting an earlier timestamp never moves backwards
        assert_eq!(tracker.observe(&at(1000)), None);
        assert_eq!(tracker.observe(&at(9990)), Some(99));
        assert_eq!(tracker.finish(), Some(100));
        assert_eq!(tracker.finish(), None);
        assert_eq!(tracker.observe(&at(10_000)), None);
    }

    #[test]
    fn test_tracker_caps_overshoot() {
        let tracker = PercentTracker::new(1.0);
        assert_eq!(tracker.observe(&at(5000)), Some(100));
        assert_eq!(tracker.finish(), None);
    }
}
