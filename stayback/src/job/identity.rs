//! Job identifiers and the remote key layout derived from them.
//!
//! Every artifact of a job lives under `stayback/<id>/` and is named after the
//! base64 encoding of the target's absolute path:
//!
//! ```text
//! s3://<bucket>/stayback/20220103-080910/L2hvbWUvbWUvLnNzaA==.tar.gz.asc
//! ```

use crate::storage::ObjectInfo;
use crate::utils::errors::{Result, StaybackError};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fmt;

/// Root of the remote key space
pub const KEY_ROOT: &str = "stayback";

const ID_FORMAT: &str = "%Y%m%d-%H%M%S";
const TARBALL_SUFFIX: &str = ".tar.gz";
const ARMOR_SUFFIX: &str = ".asc";

/// Timestamp job identifier, e.g. `20220103-080910`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    /// Id for a job starting now (local time)
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format(ID_FORMAT).to_string())
    }

    /// Parse an id, rejecting anything that is not a valid `YYYYMMDD-HHMMSS`
    pub fn parse(raw: &str) -> Result<Self> {
        // chrono accepts unpadded fields, so pin the exact shape first
        let well_formed = raw.len() == 15
            && raw.as_bytes()[8] == b'-'
            && raw
                .bytes()
                .enumerate()
                .all(|(i, b)| i == 8 || b.is_ascii_digit());

        if !well_formed || NaiveDateTime::parse_from_str(raw, ID_FORMAT).is_err() {
            return Err(StaybackError::InvalidJobId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobId {
    type Error = StaybackError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

/// Bucket-relative prefix holding every artifact of a job: `stayback/<id>/`
pub fn job_prefix(id: &JobId) -> String {
    format!("{}/{}/", KEY_ROOT, id)
}

/// Full URI of a job's prefix: `s3://<bucket>/stayback/<id>/`
pub fn key_prefix(bucket: &str, id: &JobId) -> String {
    format!("s3://{}/{}", bucket, job_prefix(id))
}

/// File name of a target's artifact, `<base64(path)>.tar.gz[.asc]`
pub fn artifact_file_name(target: &str, encrypted: bool) -> String {
    let mut name = tarball_name(target);
    if encrypted {
        name.push_str(ARMOR_SUFFIX);
    }
    name
}

/// Unencrypted tarball name for a target
pub fn tarball_name(target: &str) -> String {
    format!("{}{}", general_purpose::STANDARD.encode(target.as_bytes()), TARBALL_SUFFIX)
}

/// Bucket-relative key of a target's artifact within a job
pub fn artifact_key(id: &JobId, target: &str, encrypted: bool) -> String {
    format!("{}{}", job_prefix(id), artifact_file_name(target, encrypted))
}

/// Recover the target path and encryption flag from an artifact name.
///
/// `name` is everything after the job prefix. The encoded path may itself
/// contain `/`, so it is not the last key segment.
pub fn decode_artifact_name(name: &str) -> Option<(String, bool)> {
    let (stem, encrypted) = match name.strip_suffix(ARMOR_SUFFIX) {
        Some(stem) => (stem, true),
        None => (name, false),
    };
    let encoded = stem.strip_suffix(TARBALL_SUFFIX)?;
    let bytes = general_purpose::STANDARD.decode(encoded).ok()?;
    let target = String::from_utf8(bytes).ok()?;
    Some((target, encrypted))
}

/// Id of the most recently modified object in a listing.
///
/// On equal timestamps the first object seen wins.
pub fn latest_id(bucket: &str, objects: &[ObjectInfo]) -> Result<JobId> {
    let mut latest: Option<&ObjectInfo> = None;
    for object in objects {
        match latest {
            Some(current) if object.last_modified <= current.last_modified => {}
            _ => latest = Some(object),
        }
    }

    let latest = latest.ok_or_else(|| StaybackError::NoBackupsFound(bucket.to_string()))?;

    // stayback/<id>/<artifact>
    let segment = latest.key.split('/').nth(1).unwrap_or_default();
    JobId::parse(segment)
}
