//! Merge request pipeline.
//!
//! This crate owns the lifecycle of one merge request:
//! - Streamed, validated downloads of every source
//! - Assembly and export through `vmerge-media`
//! - Optional upload through `vmerge-storage`
//! - Synchronous cleanup on failure, deferred cleanup after success

pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod janitor;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod retry;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use context::RequestContext;
pub use error::{MergeError, MergeResult};
pub use fetch::{FetchError, Fetcher};
pub use janitor::{
    CleanupJob, CleanupReport, CleanupWarning, FsRemover, Janitor, PathRemover, PurgeReport,
    RootListing,
};
pub use logging::RequestLogger;
pub use orchestrator::{MergeFailure, MergeJob, MergeOrchestrator, MergeOutcome, NARRATION_FILE_NAME};
pub use queue::{CleanupHandle, CleanupQueue};
pub use retry::{retry_async, RetryPolicy, RetryResult};
