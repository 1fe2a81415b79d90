//! Per-target archive pipeline.
//!
//! For one target directory:
//! 1. tar it into `<local>/<id>/<base64>.tar.gz`
//! 2. replace `<local>/<base64>.tar.gz`, the latest local copy of that target
//! 3. optionally encrypt the staged tarball to `.tar.gz.asc` and drop the plaintext
//!
//! Nothing here touches the network; the staged files are uploaded later.

use crate::job::identity::{self, JobId};
use crate::shell::{args, CommandRunner};
use crate::utils::errors::{Result, StaybackError};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Input required to back up a single target
#[derive(Debug, Clone)]
pub struct TargetInput<'a> {
    /// Absolute path of the directory to back up
    pub target: &'a str,
    pub encrypt: bool,
    pub id: &'a JobId,
    /// Local backup root, the job's staging directory is `<local>/<id>`
    pub local: &'a Path,
    /// GPG recipient for encrypted targets
    pub recipient: &'a str,
}

/// Artifact left in the staging directory for a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub target: String,
    pub encrypted: bool,
    /// Staged file that will be uploaded
    pub path: PathBuf,
    /// Bucket-relative key it will be uploaded to
    pub key: String,
}

/// Paths derived from a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPaths {
    pub staged: PathBuf,
    pub latest: PathBuf,
    pub encrypted: PathBuf,
}

impl TargetPaths {
    pub fn new(target: &str, id: &JobId, local: &Path) -> Self {
        let tarball = identity::tarball_name(target);
        let staged = local.join(id.as_str()).join(&tarball);
        let encrypted = local.join(id.as_str()).join(identity::artifact_file_name(target, true));
        Self {
            staged,
            latest: local.join(tarball),
            encrypted,
        }
    }
}

/// Run the pipeline for one target
pub async fn handle_target(
    runner: &dyn CommandRunner,
    input: &TargetInput<'_>,
) -> Result<StagedArtifact> {
    let paths = TargetPaths::new(input.target, input.id, input.local);

    ensure_parent(&paths.staged).await?;
    archive(runner, input.target, &paths.staged).await?;

    ensure_parent(&paths.latest).await?;
    replace_latest(&paths.staged, &paths.latest).await?;

    let path = if input.encrypt {
        ensure_parent(&paths.encrypted).await?;
        encrypt(runner, &paths.staged, &paths.encrypted, input.recipient).await?;
        paths.encrypted
    } else {
        paths.staged
    };

    Ok(StagedArtifact {
        target: input.target.to_string(),
        encrypted: input.encrypt,
        path,
        key: identity::artifact_key(input.id, input.target, input.encrypt),
    })
}

/// Standard base64 may contain `/`, so an artifact name can span directories
async fn ensure_parent(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| StaybackError::StageFailed {
            path: parent.to_path_buf(),
            reason: e.to_string(),
        })
}

async fn archive(runner: &dyn CommandRunner, target: &str, tarball: &Path) -> Result<()> {
    let tarball_arg = tarball.to_string_lossy().into_owned();
    debug!("compressing {} -> {}", target, tarball_arg);

    runner
        .run("tar", &args(["-cpzf", tarball_arg.as_str(), target]))
        .await
        .map_err(|e| {
            error!("failed: compressing {} -> {}: {}", target, tarball_arg, e);
            StaybackError::ArchiveFailed {
                target: target.to_string(),
                reason: e.to_string(),
            }
        })?;

    debug!("success: compressing {} -> {}", target, tarball_arg);
    Ok(())
}

/// Overwrite the latest local copy of a target with the freshly staged tarball
async fn replace_latest(staged: &Path, latest: &Path) -> Result<()> {
    let stage_failed = |e: std::io::Error| {
        error!("failed to replace local tarball {}: {}", latest.display(), e);
        StaybackError::StageFailed {
            path: latest.to_path_buf(),
            reason: e.to_string(),
        }
    };

    debug!("deleting old local tarball: {}", latest.display());
    match tokio::fs::remove_file(latest).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(stage_failed(e)),
    }

    debug!("copying new tarball {} -> {}", staged.display(), latest.display());
    tokio::fs::copy(staged, latest).await.map_err(stage_failed)?;
    Ok(())
}

async fn encrypt(
    runner: &dyn CommandRunner,
    plain: &Path,
    armored: &Path,
    recipient: &str,
) -> Result<()> {
    let encrypt_failed = |reason: String| {
        error!(
            "failed: encrypting {} -> {}: {}",
            plain.display(),
            armored.display(),
            reason
        );
        StaybackError::EncryptFailed {
            path: plain.to_path_buf(),
            reason,
        }
    };

    let plain_arg = plain.to_string_lossy().into_owned();
    let armored_arg = armored.to_string_lossy().into_owned();
    debug!("encrypting {} -> {}", plain_arg, armored_arg);

    runner
        .run(
            "gpg",
            &args([
                "--openpgp",
                "--armor",
                "--batch",
                "--yes",
                "--encrypt",
                "--recipient",
                recipient,
                "--output",
                armored_arg.as_str(),
                plain_arg.as_str(),
            ]),
        )
        .await
        .map_err(|e| encrypt_failed(e.to_string()))?;

    // Only the encrypted copy is uploaded
    debug!("deleting unencrypted staged tarball: {}", plain_arg);
    tokio::fs::remove_file(plain)
        .await
        .map_err(|e| encrypt_failed(e.to_string()))?;

    Ok(())
}
