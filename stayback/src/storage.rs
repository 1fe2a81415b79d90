//! Object storage access.
//!
//! [`ObjectStore`] is the small surface the backup and restore flows need.
//! [`AwsCliStore`] implements it by driving the `aws` CLI through a
//! [`CommandRunner`].

use crate::shell::{args, CommandRunner};
use crate::utils::errors::{Result, StaybackError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// An object returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create an empty "directory" marker object at `prefix`
    async fn create_path_prefix(&self, bucket: &str, prefix: &str) -> Result<()>;

    /// List every object whose key starts with `prefix`
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Copy a local directory tree to `remote_uri`
    async fn recursive_upload(&self, local_dir: &Path, remote_uri: &str) -> Result<()>;

    /// Copy everything under `remote_uri` into a local directory
    async fn recursive_download(&self, remote_uri: &str, local_dir: &Path) -> Result<()>;
}

/// `aws s3api list-objects-v2` output. `Contents` is absent for an empty listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListObjectsOutput {
    #[serde(default)]
    contents: Vec<ListedObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
    last_modified: DateTime<Utc>,
}

/// Object store backed by the `aws` command line client
pub struct AwsCliStore {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl AwsCliStore {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            program: "aws".to_string(),
        }
    }

    fn parse_listing(raw: &str) -> Result<Vec<ObjectInfo>> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let parsed: ListObjectsOutput = serde_json::from_str(raw)?;
        Ok(parsed
            .contents
            .into_iter()
            .map(|o| ObjectInfo {
                key: o.key,
                last_modified: o.last_modified,
            })
            .collect())
    }
}

#[async_trait]
impl ObjectStore for AwsCliStore {
    async fn create_path_prefix(&self, bucket: &str, prefix: &str) -> Result<()> {
        let uri = format!("s3://{}/{}", bucket, prefix);
        self.runner
            .run(
                &self.program,
                &args(["s3api", "put-object", "--bucket", bucket, "--key", prefix]),
            )
            .await
            .map_err(|e| StaybackError::StoragePathCreateFailed {
                uri,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let list_failed = |reason: String| StaybackError::StorageListFailed {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            reason,
        };

        let output = self
            .runner
            .run(
                &self.program,
                &args([
                    "s3api",
                    "list-objects-v2",
                    "--bucket",
                    bucket,
                    "--prefix",
                    prefix,
                    "--output",
                    "json",
                ]),
            )
            .await
            .map_err(|e| list_failed(e.to_string()))?;

        // stderr may carry CLI warnings, only stdout is JSON
        let objects =
            Self::parse_listing(&output.stdout).map_err(|e| list_failed(e.to_string()))?;
        debug!("listed {} objects under s3://{}/{}", objects.len(), bucket, prefix);
        Ok(objects)
    }

    async fn recursive_upload(&self, local_dir: &Path, remote_uri: &str) -> Result<()> {
        let local = local_dir.to_string_lossy().into_owned();
        self.runner
            .run(
                &self.program,
                &args(["s3", "cp", local.as_str(), remote_uri, "--recursive"]),
            )
            .await
            .map_err(|e| StaybackError::UploadFailed {
                local: local_dir.to_path_buf(),
                uri: remote_uri.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn recursive_download(&self, remote_uri: &str, local_dir: &Path) -> Result<()> {
        let local = local_dir.to_string_lossy().into_owned();
        self.runner
            .run(
                &self.program,
                &args(["s3", "cp", remote_uri, local.as_str(), "--recursive"]),
            )
            .await
            .map_err(|e| StaybackError::DownloadFailed {
                uri: remote_uri.to_string(),
                local: local_dir.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
