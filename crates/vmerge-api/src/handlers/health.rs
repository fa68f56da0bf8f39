//! Service status handlers.

use std::path::Path;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use vmerge_media::fs_utils::is_dir_writable;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// State of one working root.
#[derive(Debug, Serialize)]
pub struct RootStatus {
    pub path: String,
    pub exists: bool,
    pub writable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_write_success: Option<bool>,
}

impl RootStatus {
    pub async fn inspect(path: &Path) -> Self {
        let exists = tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir());
        Self {
            path: path.display().to_string(),
            exists,
            writable: exists && is_dir_writable(path).await,
            test_write_success: None,
        }
    }
}

#[derive(Serialize)]
pub struct RootDirectories {
    pub output_dir: RootStatus,
    pub temp_dir: RootStatus,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub status: String,
    pub upload_enabled: bool,
    pub directories: RootDirectories,
}

/// Service banner with working root status.
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Video Merger API is running. Use /merge endpoint to merge videos.".to_string(),
        status: "ok".to_string(),
        upload_enabled: state.orchestrator.upload_enabled(),
        directories: RootDirectories {
            output_dir: RootStatus::inspect(&state.pipeline.output_root).await,
            temp_dir: RootStatus::inspect(&state.pipeline.temp_root).await,
        },
    })
}
