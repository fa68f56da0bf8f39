//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use vmerge_models::{ErrorBody, RequestError};
use vmerge_pipeline::{MergeError, MergeFailure};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Merge(#[from] MergeFailure),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Merge(failure) => merge_status(&failure.error),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 502 for unusable remote sources, 500 for everything else.
fn merge_status(error: &MergeError) -> StatusCode {
    if error.is_upstream() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<RequestError> for ApiError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::Malformed(_) => ApiError::BadRequest(e.to_string()),
            RequestError::Invalid(_) => ApiError::Validation(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(error = %detail, "Internal error");
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmerge_models::{MergeRequest, MergeStage, RequestId};
    use vmerge_pipeline::CleanupReport;

    fn failure(error: MergeError) -> ApiError {
        ApiError::Merge(MergeFailure {
            request_id: RequestId::from_string("r1"),
            stage: MergeStage::Fetching,
            error,
            cleanup: CleanupReport::default(),
        })
    }

    #[test]
    fn test_status_mapping() {
        let malformed = MergeRequest::from_json("{not json").unwrap_err();
        assert_eq!(ApiError::from(malformed).status_code(), StatusCode::BAD_REQUEST);

        let invalid = MergeRequest::from_json(r#"{"video_urls": []}"#).unwrap_err();
        assert_eq!(
            ApiError::from(invalid).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        assert_eq!(
            failure(MergeError::fetch("timed out")).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failure(MergeError::export("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_merge_message_is_passed_through() {
        let err = failure(MergeError::fetch("Failed to download video 2 from http://x/2.mp4: boom"));
        assert_eq!(err.to_string(), "Failed to download video 2 from http://x/2.mp4: boom");
    }
}
