//! Request handlers.

pub mod directories;
pub mod health;
pub mod merge;

pub use directories::{check_directories, list_videos, verify_cleanup};
pub use health::{health, root};
pub use merge::merge;
