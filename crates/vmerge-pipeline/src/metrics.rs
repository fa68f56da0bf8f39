//! Pipeline metrics, recorded through the `metrics` facade.

use metrics::{counter, histogram};
use std::time::Duration;
use vmerge_models::MergeStage;

/// Metric names as constants for consistency.
pub mod names {
    pub const MERGES_STARTED_TOTAL: &str = "vmerge_merges_started_total";
    pub const MERGES_COMPLETED_TOTAL: &str = "vmerge_merges_completed_total";
    pub const MERGES_FAILED_TOTAL: &str = "vmerge_merges_failed_total";
    pub const STAGE_DURATION_SECONDS: &str = "vmerge_stage_duration_seconds";
    pub const UPLOADS_TOTAL: &str = "vmerge_uploads_total";
    pub const FETCHED_BYTES_TOTAL: &str = "vmerge_fetched_bytes_total";
    pub const CLEANUP_WARNINGS_TOTAL: &str = "vmerge_cleanup_warnings_total";
    pub const CLEANUP_JOBS_TOTAL: &str = "vmerge_cleanup_jobs_total";
}

pub fn record_merge_started() {
    counter!(names::MERGES_STARTED_TOTAL).increment(1);
}

pub fn record_merge_completed() {
    counter!(names::MERGES_COMPLETED_TOTAL).increment(1);
}

/// Record a failed merge, labelled with the stage it failed in.
pub fn record_merge_failed(stage: MergeStage, kind: &str) {
    let labels = [("stage", stage.as_str().to_string()), ("kind", kind.to_string())];
    counter!(names::MERGES_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_stage_duration(stage: MergeStage, elapsed: Duration) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(elapsed.as_secs_f64());
}

pub fn record_upload(success: bool) {
    let labels = [("outcome", if success { "uploaded" } else { "failed" }.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
}

pub fn record_fetched_bytes(bytes: u64) {
    counter!(names::FETCHED_BYTES_TOTAL).increment(bytes);
}

pub fn record_cleanup_warning() {
    counter!(names::CLEANUP_WARNINGS_TOTAL).increment(1);
}

pub fn record_cleanup_job(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::CLEANUP_JOBS_TOTAL, &labels).increment(1);
}
