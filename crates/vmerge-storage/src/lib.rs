//! Remote storage for merged artifacts.
//!
//! This crate provides:
//! - The [`Uploader`] seam used by the merge pipeline
//! - An S3-compatible implementation targeting Cloudflare R2
//! - A disabled implementation for deployments without storage credentials

pub mod client;
pub mod error;
pub mod uploader;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use uploader::{object_key, DisabledUploader, R2Uploader, Uploader};
