//! Existence checks for backup targets.
//!
//! Every target is checked so a single run reports all missing directories at
//! once instead of failing on the first one.

use crate::utils::errors::{Result, StaybackError};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error};

/// Check every path and report whether it is an existing directory
pub fn check_all(paths: &[String]) -> BTreeMap<String, bool> {
    paths
        .iter()
        .map(|p| (p.clone(), is_existing_dir(p)))
        .collect()
}

/// Validate both target lists, logging each failure before returning a single
/// aggregate error.
///
/// The plain list is merged after the encrypted one, so on a cross-list
/// duplicate the plain result is the one reported.
pub fn validate_all(encrypted: &[String], plain: &[String]) -> Result<()> {
    let mut report = check_all(encrypted);
    report.extend(check_all(plain));

    let mut missing = Vec::new();
    for (path, exists) in &report {
        if *exists {
            debug!("target exists: {}", path);
        } else {
            error!("target does not exist: {}", path);
            missing.push(path.clone());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StaybackError::MissingTarget { missing })
    }
}

fn is_existing_dir(path: &str) -> bool {
    std::fs::metadata(Path::new(path))
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_all_reports_each_path() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let real_dir = temp_dir.path().to_string_lossy().into_owned();

        let result = check_all(&["/aa/bb/cc".to_string(), real_dir.clone()]);

        let mut expected = BTreeMap::new();
        expected.insert("/aa/bb/cc".to_string(), false);
        expected.insert(real_dir, true);
        assert_eq!(result, expected);
        Ok(())
    }

    #[test]
    fn test_check_all_regular_file_is_not_a_target() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, b"content")?;

        let path = file.to_string_lossy().into_owned();
        assert_eq!(check_all(&[path.clone()]).get(&path), Some(&false));
        Ok(())
    }

    #[test]
    fn test_validate_all_ok() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let real_dir = temp_dir.path().to_string_lossy().into_owned();

        assert!(validate_all(&[real_dir.clone()], &[real_dir]).is_ok());
        assert!(validate_all(&[], &[]).is_ok());
        Ok(())
    }

    #[test]
    fn test_validate_all_reports_every_missing_path() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let real_dir = temp_dir.path().to_string_lossy().into_owned();

        let err = validate_all(
            &["/missing/one".to_string(), real_dir],
            &["/missing/two".to_string()],
        )
        .unwrap_err();

        match err {
            StaybackError::MissingTarget { missing } => {
                assert_eq!(missing, vec!["/missing/one".to_string(), "/missing/two".to_string()]);
            }
            other => panic!("expected MissingTarget, got {:?}", other),
        }
        Ok(())
    }
}
