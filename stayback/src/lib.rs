//! Stayback Library
//!
//! Backs up local directories as (optionally encrypted) tarballs to an S3
//! bucket under a timestamped job id, and restores them.

pub mod config;
pub mod executor;
pub mod job;
pub mod restore;
pub mod shell;
pub mod shutdown;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use job::identity::JobId;
pub use job::{Job, JobDescriptor};
pub use utils::errors::StaybackError;
pub type Result<T> = std::result::Result<T, StaybackError>;
