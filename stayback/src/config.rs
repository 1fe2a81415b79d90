//! Configuration management for stayback.
//!
//! The job is described by a JSON file, by default `$HOME/.stayback` or
//! `$HOME/.stayback.json`. `STAYBACK_CONFIG` points at a different file.

use crate::job::JobDescriptor;
use crate::utils::errors::{Result, StaybackError};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "STAYBACK_CONFIG";

/// Locate the config file
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let home = dirs::home_dir().ok_or_else(|| StaybackError::ConfigLoadFailed {
        path: PathBuf::from(".stayback"),
        reason: "cannot determine home directory".to_string(),
    })?;
    Ok(config_path_in(&home))
}

/// `<home>/.stayback` when it is a regular file, `<home>/.stayback.json` otherwise
pub fn config_path_in(home: &Path) -> PathBuf {
    let plain = home.join(".stayback");
    if plain.is_file() {
        plain
    } else {
        home.join(".stayback.json")
    }
}

/// Load and check a job descriptor from a JSON file
pub fn from_file(path: &Path) -> Result<JobDescriptor> {
    let load_failed = |reason: String| StaybackError::ConfigLoadFailed {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
    let mut descriptor: JobDescriptor =
        serde_json::from_str(&content).map_err(|e| load_failed(e.to_string()))?;

    apply_defaults(&mut descriptor);
    check(&descriptor).map_err(load_failed)?;
    Ok(descriptor)
}

fn apply_defaults(descriptor: &mut JobDescriptor) {
    if descriptor.source.is_empty() {
        descriptor.source = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_default();
    }

    if descriptor.home_directory.as_os_str().is_empty() {
        if let Some(home) = dirs::home_dir() {
            descriptor.home_directory = home;
        }
    }
}

fn check(descriptor: &JobDescriptor) -> std::result::Result<(), String> {
    if descriptor.bucket.is_empty() {
        return Err("s3Bucket is required".to_string());
    }
    if descriptor.backup_directory.as_os_str().is_empty() {
        return Err("backupDirectory is required".to_string());
    }
    if descriptor.home_directory.as_os_str().is_empty() {
        return Err(
            "homeDirectory is required when the home directory cannot be determined".to_string(),
        );
    }
    // Relative targets are joined onto it and must come out absolute
    if !descriptor.home_directory.is_absolute() {
        return Err(format!(
            "homeDirectory must be absolute, got {}",
            descriptor.home_directory.display()
        ));
    }
    if !descriptor.encrypted_targets.is_empty() && descriptor.recipient.is_empty() {
        return Err("recipient is required when encryptedDirs is set".to_string());
    }
    Ok(())
}
