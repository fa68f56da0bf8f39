//! Working root inspection and maintenance.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use vmerge_pipeline::RootListing;

use crate::handlers::health::{RootDirectories, RootStatus};
use crate::state::AppState;

/// Probe file written by the directory check.
const TEST_WRITE_FILE: &str = "test_write.txt";

#[derive(Serialize)]
pub struct DirectoryCheck {
    pub status: String,
    pub directories: RootDirectories,
}

/// Create both roots and prove the output root accepts writes.
pub async fn check_directories(State(state): State<AppState>) -> Json<DirectoryCheck> {
    if let Err(e) = state.pipeline.ensure_roots().await {
        error!(error = %e, "Failed to create working roots");
    }

    let probe = state.pipeline.output_root.join(TEST_WRITE_FILE);
    let test_write_success = match tokio::fs::write(&probe, b"Test write access").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            true
        }
        Err(e) => {
            error!(path = %probe.display(), error = %e, "Failed to write test file");
            false
        }
    };

    let mut output_dir = RootStatus::inspect(&state.pipeline.output_root).await;
    output_dir.test_write_success = Some(test_write_success);

    Json(DirectoryCheck {
        status: "ok".to_string(),
        directories: RootDirectories {
            output_dir,
            temp_dir: RootStatus::inspect(&state.pipeline.temp_root).await,
        },
    })
}

#[derive(Debug, Serialize)]
pub struct DirectoryListing {
    pub path: String,
    pub file_count: usize,
    pub files: Vec<String>,
}

impl From<RootListing> for DirectoryListing {
    fn from(listing: RootListing) -> Self {
        Self {
            path: listing.path.display().to_string(),
            file_count: listing.file_count(),
            files: listing.entries,
        }
    }
}

#[derive(Serialize)]
pub struct RootListings {
    pub temp_directory: DirectoryListing,
    pub output_directory: DirectoryListing,
}

impl From<(RootListing, RootListing)> for RootListings {
    fn from((temp, output): (RootListing, RootListing)) -> Self {
        Self {
            temp_directory: temp.into(),
            output_directory: output.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupView {
    CurrentState {
        #[serde(flatten)]
        listings: RootListings,
        message: String,
        example: String,
    },
    CleanupPerformed {
        before_cleanup: RootListings,
        after_cleanup: RootListings,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyCleanupQuery {
    #[serde(default)]
    pub run_cleanup: bool,
}

/// List both roots, optionally purging them first.
pub async fn verify_cleanup(
    State(state): State<AppState>,
    Query(query): Query<VerifyCleanupQuery>,
) -> Json<CleanupView> {
    let before = RootListings::from(state.janitor.list_roots().await);

    if !query.run_cleanup {
        return Json(CleanupView::CurrentState {
            listings: before,
            message: "To run cleanup, add ?run_cleanup=true to the URL".to_string(),
            example: "/verify-cleanup?run_cleanup=true".to_string(),
        });
    }

    info!("Running full purge on request");
    let report = state.janitor.full_purge().await;

    Json(CleanupView::CleanupPerformed {
        before_cleanup: before,
        after_cleanup: (report.temp, report.output).into(),
    })
}

#[derive(Serialize)]
pub struct VideoList {
    pub message: String,
    pub videos: Vec<String>,
}

/// Merged videos are never retained, so there is nothing to list.
pub async fn list_videos() -> Json<VideoList> {
    Json(VideoList {
        message: "Videos are not retained on the server. Each merged video is removed once its request has been handled.".to_string(),
        videos: Vec::new(),
    })
}
