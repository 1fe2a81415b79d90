//! Target path normalization.
//!
//! Configured targets may be absolute or relative to the job's home directory
//! and may repeat. Normalizing turns them into a sorted list of unique absolute
//! paths so the rest of the job can compare and name them reliably.

use crate::utils::errors::{Result, StaybackError};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Whether normalization also requires each target to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizePolicy {
    /// Pure string transformation, existence is checked in a separate pass
    #[default]
    Lexical,

    /// Every resolved path must exist and be a directory
    RequireExisting,
}

/// Resolve, sort and dedup `paths` against `root`.
///
/// Entries starting with the path separator pass through unchanged; anything
/// else is joined onto `root`. The output is always in sorted order.
pub fn normalize(paths: &[String], root: &str) -> Vec<String> {
    let mut resolved: Vec<String> = paths.iter().map(|p| make_absolute(p, root)).collect();

    // Sorting groups duplicates together so a single dedup pass removes them
    resolved.sort();
    resolved.dedup();
    resolved
}

/// Normalize with an explicit policy.
pub fn normalize_with(
    paths: &[String],
    root: &str,
    policy: NormalizePolicy,
) -> Result<Vec<String>> {
    let normalized = normalize(paths, root);

    if policy == NormalizePolicy::RequireExisting {
        for path in &normalized {
            let metadata = std::fs::metadata(path).map_err(|e| StaybackError::InvalidTarget {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            if !metadata.is_dir() {
                return Err(StaybackError::InvalidTarget {
                    path: path.clone(),
                    reason: "not a directory".to_string(),
                });
            }
        }
    }

    Ok(normalized)
}

/// Join a relative `dir` onto `root`, leaving absolute paths alone
pub fn make_absolute(dir: &str, root: &str) -> String {
    if dir.starts_with(MAIN_SEPARATOR) {
        return dir.to_string();
    }
    clean(&Path::new(root).join(dir)).to_string_lossy().into_owned()
}

/// Lexically clean a joined path: drops `.`, repeated and trailing
/// separators, and lets `..` pop the previous segment.
fn clean(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }
    components.iter().collect()
}
