//! Custom error types for stayback.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StaybackError {
    #[error("Failed to load config {path}: {reason}")]
    ConfigLoadFailed { path: PathBuf, reason: String },

    #[error("{} target directories do not exist: {}", .missing.len(), .missing.join(", "))]
    MissingTarget { missing: Vec<String> },

    #[error("Invalid target {path}: {reason}")]
    InvalidTarget { path: String, reason: String },

    #[error("Failed to create storage path {uri}: {reason}")]
    StoragePathCreateFailed { uri: String, reason: String },

    #[error("Failed to list objects under s3://{bucket}/{prefix}: {reason}")]
    StorageListFailed {
        bucket: String,
        prefix: String,
        reason: String,
    },

    #[error("Failed to archive {target}: {reason}")]
    ArchiveFailed { target: String, reason: String },

    #[error("Failed to encrypt {path}: {reason}")]
    EncryptFailed { path: PathBuf, reason: String },

    #[error("Failed to stage {path}: {reason}")]
    StageFailed { path: PathBuf, reason: String },

    #[error("Failed to upload {local} -> {uri}: {reason}")]
    UploadFailed {
        local: PathBuf,
        uri: String,
        reason: String,
    },

    #[error("Failed to download {uri} -> {local}: {reason}")]
    DownloadFailed {
        uri: String,
        local: PathBuf,
        reason: String,
    },

    #[error("Restore directory already exists: {0}")]
    RestoreDirAlreadyExists(PathBuf),

    #[error("No backups found in bucket {0}")]
    NoBackupsFound(String),

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error(
        "Command `{program}` exited with {}: {output}",
        .exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string())
    )]
    Command {
        program: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Job cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StaybackError>;
