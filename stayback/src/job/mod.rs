//! Backup job definition.
//!
//! A [`JobDescriptor`] is what the config file describes. A [`Job`] pairs it
//! with the id assigned at run start; the id cannot change afterwards.

pub mod identity;
pub mod paths;
pub mod validate;

use identity::JobId;
use paths::NormalizePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::errors::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    /// Free-form origin tag
    #[serde(default)]
    pub source: String,

    /// Identifies the GPG public key used for encrypted targets
    #[serde(default)]
    pub recipient: String,

    /// Root for relative target paths
    #[serde(default)]
    pub home_directory: PathBuf,

    /// Local staging root; each job gets a `<id>` sub-directory
    #[serde(default)]
    pub backup_directory: PathBuf,

    /// Destination bucket
    #[serde(rename = "s3Bucket", alias = "bucket", default)]
    pub bucket: String,

    /// Targets archived and encrypted
    #[serde(rename = "encryptedDirs", default)]
    pub encrypted_targets: Vec<String>,

    /// Targets archived without encryption
    #[serde(rename = "unEncryptedDirs", default)]
    pub plain_targets: Vec<String>,
}

impl JobDescriptor {
    /// Resolve both target lists against the home directory
    pub fn normalize_targets(&mut self, policy: NormalizePolicy) -> Result<()> {
        let root = self.home_directory.to_string_lossy().into_owned();
        self.encrypted_targets = paths::normalize_with(&self.encrypted_targets, &root, policy)?;
        self.plain_targets = paths::normalize_with(&self.plain_targets, &root, policy)?;
        Ok(())
    }

    /// Check that every target exists, reporting all missing ones
    pub fn validate_targets(&self) -> Result<()> {
        validate::validate_all(&self.encrypted_targets, &self.plain_targets)
    }

    /// Every target paired with whether it is encrypted, encrypted ones first
    pub fn targets(&self) -> impl Iterator<Item = (&str, bool)> {
        self.encrypted_targets
            .iter()
            .map(|t| (t.as_str(), true))
            .chain(self.plain_targets.iter().map(|t| (t.as_str(), false)))
    }

    pub fn target_count(&self) -> usize {
        self.encrypted_targets.len() + self.plain_targets.len()
    }
}

/// A descriptor bound to its run's id
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    pub descriptor: JobDescriptor,
}

impl Job {
    pub fn new(descriptor: JobDescriptor, id: JobId) -> Self {
        Self { id, descriptor }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// `<backupDirectory>/<id>`, used for staging and for restores
    pub fn job_dir(&self) -> PathBuf {
        self.descriptor.backup_directory.join(self.id.as_str())
    }

    /// `s3://<bucket>/stayback/<id>/`
    pub fn remote_uri(&self) -> String {
        identity::key_prefix(&self.descriptor.bucket, &self.id)
    }

    /// One-line description logged before a job starts
    pub fn summary(&self) -> String {
        format!(
            "job {} (source: {}): {} encrypted, {} plain targets -> {}",
            self.id,
            if self.descriptor.source.is_empty() { "-" } else { self.descriptor.source.as_str() },
            self.descriptor.encrypted_targets.len(),
            self.descriptor.plain_targets.len(),
            self.remote_uri()
        )
    }
}
