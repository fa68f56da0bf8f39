//! Structured request logging.
//!
//! Every line a merge emits carries its request id and the operation, so one
//! request can be followed through interleaved concurrent output.

use tracing::{error, info, warn, Span};
use vmerge_models::{MergeStage, RequestId};

/// Logger bound to one request.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: String,
    operation: String,
}

impl RequestLogger {
    /// # Arguments
    /// * `request_id` - The request being served
    /// * `operation` - What the request is doing (e.g. "merge")
    pub fn new(request_id: &RequestId, operation: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request started: {}", message
        );
    }

    /// Log a stage boundary.
    pub fn log_stage(&self, stage: MergeStage) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            stage = %stage,
            "Entering stage"
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request warning: {}", message
        );
    }

    pub fn log_error(&self, stage: MergeStage, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = %self.operation,
            stage = %stage,
            "Request failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping the whole request.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "merge",
            request_id = %self.request_id,
            operation = %self.operation
        )
    }
}
