//! File fingerprints for dependency-aware cache keys
//!
//! A fingerprint summarises the current state of one or more dependency
//! files. Embedding it in a cache key makes the key change whenever the
//! file changes, so no explicit invalidation is needed.
//!
//! Fingerprinting never fails: an unreadable or missing file is treated as
//! absent, which at worst means a recompute.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Opaque token describing dependency file state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// File modification time in nanoseconds since the Unix epoch
    Mtime(u128),
    /// Combined SHA256 digest of file contents (hex)
    Content(String),
    /// No file could be stat'ed or read
    Absent,
}

impl Fingerprint {
    /// Whether the fingerprint reflects an existing file
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Key segment for this fingerprint, `None` when absent
    pub fn key_segment(&self) -> Option<String> {
        match self {
            Self::Mtime(nanos) => Some(format!("m{}", nanos)),
            Self::Content(digest) => Some(format!("h{}", digest)),
            Self::Absent => None,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key_segment() {
            Some(segment) => write!(f, "{}", segment),
            None => write!(f, "absent"),
        }
    }
}

/// Which fingerprint a memoized function embeds in its key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintPolicy {
    /// Pure TTL, no file dependency
    None,
    /// Last-modified time of a single file
    #[default]
    Mtime,
    /// Content hash of a list of files
    Content,
}

impl FingerprintPolicy {
    /// Compute the fingerprint of `paths` under this policy
    ///
    /// `Mtime` only looks at the first path.
    pub fn fingerprint(&self, paths: &[PathBuf]) -> Fingerprint {
        match self {
            Self::None => Fingerprint::Absent,
            Self::Mtime => paths
                .first()
                .map(|p| mtime_fingerprint(p))
                .unwrap_or(Fingerprint::Absent),
            Self::Content => content_fingerprint(paths),
        }
    }
}

impl fmt::Display for FingerprintPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Mtime => "mtime",
            Self::Content => "content",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for FingerprintPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "mtime" => Ok(Self::Mtime),
            "content" => Ok(Self::Content),
            _ => Err(CacheError::User(format!(
                "Fingerprint must be none, mtime or content, got {}",
                s
            ))),
        }
    }
}

/// Last-modified time of `path`, or `Absent` if it cannot be stat'ed
pub fn mtime_fingerprint(path: &Path) -> Fingerprint {
    match modified_time(path) {
        Some(mtime) => {
            let nanos = mtime
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            Fingerprint::Mtime(nanos)
        }
        None => Fingerprint::Absent,
    }
}

/// Combined content hash of every readable file in `paths`
///
/// Order matters: the per-file digests are chained in the order given.
/// Missing or unreadable files are skipped; if none can be read the result
/// is `Absent`.
pub fn content_fingerprint(paths: &[PathBuf]) -> Fingerprint {
    let mut combined = Sha256::new();
    let mut hashed = 0usize;

    for path in paths {
        if let Some(digest) = hash_file_contents(path) {
            combined.update(digest);
            hashed += 1;
        }
    }

    if hashed == 0 {
        return Fingerprint::Absent;
    }

    // First 16 hex chars are plenty to tell file states apart
    let result = combined.finalize();
    Fingerprint::Content(hex::encode(&result[..8]))
}

/// Modification time of a file, swallowing any IO error
pub(crate) fn modified_time(path: &Path) -> Option<SystemTime> {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(mtime) => Some(mtime),
        Err(e) => {
            debug!("No mtime for {}: {}", path.display(), e);
            None
        }
    }
}

fn hash_file_contents(path: &Path) -> Option<[u8; 32]> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!("Skipping {} in content fingerprint: {}", path.display(), e);
            return None;
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Some(hasher.finalize().into())
}
