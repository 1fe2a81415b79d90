//! Restore a backup job from the bucket into the local backup directory.

use crate::job::identity::{self, JobId, KEY_ROOT};
use crate::job::{Job, JobDescriptor};
use crate::storage::ObjectStore;
use crate::utils::errors::{Result, StaybackError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Restore execution result
#[derive(Debug)]
pub struct RestoreResult {
    pub id: JobId,
    pub restore_dir: PathBuf,
    pub remote_uri: String,
}

pub struct RestoreExecutor {
    store: Arc<dyn ObjectStore>,
}

impl RestoreExecutor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Use `requested` if given, otherwise the most recent job in the bucket
    pub async fn resolve_id(&self, bucket: &str, requested: Option<&str>) -> Result<JobId> {
        if let Some(raw) = requested {
            return JobId::parse(raw);
        }

        let objects = self.store.list_objects(bucket, &format!("{}/", KEY_ROOT)).await?;
        let id = identity::latest_id(bucket, &objects)?;
        debug!("latest job in {} is {}", bucket, id);
        Ok(id)
    }

    /// Download a job into `<backupDirectory>/<id>`. An existing restore
    /// directory is never reused.
    pub async fn restore(
        &self,
        descriptor: JobDescriptor,
        requested: Option<&str>,
    ) -> Result<RestoreResult> {
        let id = self.resolve_id(&descriptor.bucket, requested).await?;
        let job = Job::new(descriptor, id);

        let restore_dir = job.job_dir();
        if tokio::fs::try_exists(&restore_dir).await? {
            return Err(StaybackError::RestoreDirAlreadyExists(restore_dir));
        }
        tokio::fs::create_dir_all(&restore_dir).await?;

        let remote_uri = job.remote_uri();
        info!("Restoring {} -> {}", remote_uri, restore_dir.display());
        self.store.recursive_download(&remote_uri, &restore_dir).await?;

        Ok(RestoreResult {
            id: job.id().clone(),
            restore_dir,
            remote_uri,
        })
    }
}
