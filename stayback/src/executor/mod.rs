//! Backup job executor - Orchestrates a backup run.
//!
//! The run is strictly sequential:
//! - normalize and validate every target
//! - create the remote job prefix, an early access check
//! - archive (and optionally encrypt) each target into the staging directory
//! - upload the staging directory to the job prefix

pub mod target;

use crate::job::identity::JobId;
use crate::job::paths::NormalizePolicy;
use crate::job::{identity, Job};
use crate::shell::CommandRunner;
use crate::storage::ObjectStore;
use crate::utils::errors::{Result, StaybackError};
use std::path::PathBuf;
use std::sync::Arc;
use target::{handle_target, StagedArtifact, TargetInput};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

/// Backup execution result
#[derive(Debug)]
pub struct BackupResult {
    pub id: JobId,
    pub staging_dir: PathBuf,
    pub remote_uri: String,
    pub artifacts: Vec<StagedArtifact>,
    pub duration_secs: u64,
}

/// Main backup executor
pub struct BackupExecutor {
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn ObjectStore>,
    cancel_token: CancellationToken,
}

impl BackupExecutor {
    /// Create a new backup executor (no cancellation support)
    pub fn new(runner: Arc<dyn CommandRunner>, store: Arc<dyn ObjectStore>) -> Self {
        Self::with_cancel(runner, store, CancellationToken::new())
    }

    /// Create a new backup executor with cancellation support.
    ///
    /// The token is checked between targets, never in the middle of one.
    pub fn with_cancel(
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn ObjectStore>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            runner,
            store,
            cancel_token,
        }
    }

    /// Execute a backup job
    pub async fn execute(&self, mut job: Job) -> Result<BackupResult> {
        let start_time = std::time::Instant::now();

        // Targets may be relative to the home directory and repeated
        job.descriptor.normalize_targets(NormalizePolicy::Lexical)?;
        info!("Starting {}", job.summary());

        // Report every missing target before doing anything else
        job.descriptor.validate_targets()?;

        let remote_uri = job.remote_uri();
        let bucket = job.descriptor.bucket.as_str();
        let prefix = identity::job_prefix(job.id());
        if let Err(e) = self.store.create_path_prefix(bucket, &prefix).await {
            error!("Failed to create s3 path {}: {}", remote_uri, e);
            return Err(e);
        }
        info!("Created s3 path: {}", remote_uri);

        let staging_dir = job.job_dir();
        tokio::fs::create_dir_all(&staging_dir)
            .await
            .map_err(|e| StaybackError::StageFailed {
                path: staging_dir.clone(),
                reason: e.to_string(),
            })?;

        let total = job.descriptor.target_count();
        let mut artifacts = Vec::with_capacity(total);

        for (index, (target, encrypt)) in job.descriptor.targets().enumerate() {
            self.check_cancelled()?;

            let input = TargetInput {
                target,
                encrypt,
                id: job.id(),
                local: &job.descriptor.backup_directory,
                recipient: &job.descriptor.recipient,
            };

            let span = info_span!("target", path = %target, encrypt);
            let artifact = handle_target(self.runner.as_ref(), &input)
                .instrument(span)
                .await?;
            info!(
                "[{}/{}] Staged {} -> {}",
                index + 1,
                total,
                target,
                artifact.path.display()
            );
            artifacts.push(artifact);
        }

        self.check_cancelled()?;

        info!("Uploading files: {} -> {}", staging_dir.display(), remote_uri);
        if let Err(e) = self.store.recursive_upload(&staging_dir, &remote_uri).await {
            error!(
                "Failed to upload files {} -> {}: {}",
                staging_dir.display(),
                remote_uri,
                e
            );
            return Err(e);
        }

        Ok(BackupResult {
            id: job.id().clone(),
            staging_dir,
            remote_uri,
            artifacts,
            duration_secs: start_time.elapsed().as_secs(),
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            info!("Backup cancelled");
            return Err(StaybackError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobDescriptor;
    use crate::shell::mock::MockRunner;
    use crate::shell::CommandOutput;
    use crate::storage::AwsCliStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        home: PathBuf,
        backups: PathBuf,
    }

    impl Fixture {
        fn new() -> std::io::Result<Self> {
            let temp_dir = TempDir::new()?;
            let home = temp_dir.path().join("home");
            let backups = temp_dir.path().join("backups");
            std::fs::create_dir_all(home.join(".ssh"))?;
            std::fs::create_dir_all(home.join("photos"))?;
            Ok(Self {
                _temp_dir: temp_dir,
                home,
                backups,
            })
        }

        fn job(&self, encrypted: &[&str], plain: &[&str]) -> Job {
            let descriptor = JobDescriptor {
                source: "test".to_string(),
                recipient: "me@example.com".to_string(),
                home_directory: self.home.clone(),
                backup_directory: self.backups.clone(),
                bucket: "my-bucket".to_string(),
                encrypted_targets: encrypted.iter().map(|s| s.to_string()).collect(),
                plain_targets: plain.iter().map(|s| s.to_string()).collect(),
            };
            Job::new(descriptor, JobId::parse("20220306-070110").unwrap())
        }
    }

    fn executor(runner: &Arc<MockRunner>) -> BackupExecutor {
        let store = Arc::new(AwsCliStore::new(runner.clone()));
        BackupExecutor::new(runner.clone(), store)
    }

    #[tokio::test]
    async fn test_full_backup() -> std::io::Result<()> {
        let fixture = Fixture::new()?;
        let runner = Arc::new(MockRunner::new());

        let result = executor(&runner)
            .execute(fixture.job(&[".ssh", ".ssh"], &["photos"]))
            .await
            .unwrap();

        assert_eq!(result.id.as_str(), "20220306-070110");
        assert_eq!(result.staging_dir, fixture.backups.join("20220306-070110"));
        assert_eq!(result.remote_uri, "s3://my-bucket/stayback/20220306-070110/");
        assert_eq!(result.artifacts.len(), 2);
        assert!(result.artifacts[0].encrypted);
        assert!(!result.artifacts[1].encrypted);
        for artifact in &result.artifacts {
            assert!(artifact.path.exists());
        }

        // Order: prefix marker, archive + encrypt, archive, upload
        let programs: Vec<_> = runner.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, vec!["aws", "tar", "gpg", "tar", "aws"]);

        let upload = runner.calls_to("aws").pop().unwrap();
        assert!(upload.has_arg("cp"));
        assert!(upload.has_arg(&result.staging_dir.to_string_lossy()));
        assert!(upload.has_arg("s3://my-bucket/stayback/20220306-070110/"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_targets_abort_before_storage() -> std::io::Result<()> {
        let fixture = Fixture::new()?;
        let runner = Arc::new(MockRunner::new());

        let err = executor(&runner)
            .execute(fixture.job(&["gone"], &["photos", "/also/gone"]))
            .await
            .unwrap_err();

        match err {
            StaybackError::MissingTarget { missing } => {
                assert_eq!(missing.len(), 2);
                assert!(missing.contains(&"/also/gone".to_string()));
            }
            other => panic!("expected MissingTarget, got {:?}", other),
        }
        assert!(runner.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_prefix_creation_failure_aborts_before_archiving() -> std::io::Result<()> {
        let fixture = Fixture::new()?;
        let runner = Arc::new(MockRunner::new().fail_on_arg("aws", "put-object"));

        let err = executor(&runner)
            .execute(fixture.job(&[], &["photos"]))
            .await
            .unwrap_err();

        assert!(matches!(err, StaybackError::StoragePathCreateFailed { .. }));
        assert!(runner.calls_to("tar").is_empty());
        assert!(!fixture.backups.join("20220306-070110").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_first_target_failure_aborts_job() -> std::io::Result<()> {
        let fixture = Fixture::new()?;
        let runner = Arc::new(MockRunner::new().fail_on("gpg"));

        let err = executor(&runner)
            .execute(fixture.job(&[".ssh"], &["photos"]))
            .await
            .unwrap_err();

        assert!(matches!(err, StaybackError::EncryptFailed { .. }));
        assert_eq!(runner.calls_to("tar").len(), 1);
        // Only the prefix marker reached aws
        assert_eq!(runner.calls_to("aws").len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_failure() -> std::io::Result<()> {
        let fixture = Fixture::new()?;
        let runner = Arc::new(MockRunner::new().fail_on_arg("aws", "cp"));

        let err = executor(&runner)
            .execute(fixture.job(&[], &["photos"]))
            .await
            .unwrap_err();

        assert!(matches!(err, StaybackError::UploadFailed { .. }));
        // Staged artifacts are left in place
        let staged = std::fs::read_dir(fixture.backups.join("20220306-070110"))?.count();
        assert_eq!(staged, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_before_targets() -> std::io::Result<()> {
        let fixture = Fixture::new()?;
        let runner = Arc::new(MockRunner::new());
        let token = CancellationToken::new();
        token.cancel();

        let store = Arc::new(AwsCliStore::new(runner.clone()));
        let executor = BackupExecutor::with_cancel(runner.clone(), store, token);

        let err = executor
            .execute(fixture.job(&[], &["photos"]))
            .await
            .unwrap_err();

        assert!(matches!(err, StaybackError::Cancelled));
        assert!(runner.calls_to("tar").is_empty());
        Ok(())
    }

    /// Cancels the token as soon as the first archive is written
    struct CancelOnArchive {
        inner: MockRunner,
        token: CancellationToken,
    }

    #[async_trait]
    impl CommandRunner for CancelOnArchive {
        async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            let output = self.inner.run(program, args).await;
            if program == "tar" {
                self.token.cancel();
            }
            output
        }
    }

    #[tokio::test]
    async fn test_cancelled_between_targets() -> std::io::Result<()> {
        let fixture = Fixture::new()?;
        let token = CancellationToken::new();
        let runner = Arc::new(CancelOnArchive {
            inner: MockRunner::new(),
            token: token.clone(),
        });
        let store = Arc::new(AwsCliStore::new(runner.clone()));
        let executor = BackupExecutor::with_cancel(runner.clone(), store, token);

        let err = executor
            .execute(fixture.job(&[], &[".ssh", "photos"]))
            .await
            .unwrap_err();

        assert!(matches!(err, StaybackError::Cancelled));
        // The target in progress finishes, the next one never starts
        assert_eq!(runner.inner.calls_to("tar").len(), 1);
        assert!(runner.inner.calls_to("aws").iter().all(|c| !c.has_arg("cp")));

        let latest = fixture
            .backups
            .join(identity::tarball_name(&fixture.home.join(".ssh").to_string_lossy()));
        assert!(latest.exists());
        Ok(())
    }
}
