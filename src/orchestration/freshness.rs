//! Read-only freshness probe over the tracked files

use crate::cache::fingerprint::modified_time;
use crate::data::TrackedFileSet;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Freshness of every tracked file, by path
pub type FreshnessReport = BTreeMap<PathBuf, FileFreshness>;

/// Metadata snapshot of one tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileFreshness {
    pub exists: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Where a tracked file stands relative to the last refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessState {
    /// Missing or unreadable
    Unknown,
    /// Present and not modified since the cache last caught up
    Fresh,
    /// Modified inside the recent window and after the last refresh
    RecentlyModified,
}

impl fmt::Display for FreshnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Fresh => "fresh",
            Self::RecentlyModified => "recently modified",
        };
        f.write_str(label)
    }
}

impl FileFreshness {
    /// Stat `path`
    pub fn probe(path: &Path) -> Self {
        let modified = modified_time(path);
        Self {
            exists: path.exists(),
            last_modified: modified.map(DateTime::<Utc>::from),
        }
    }

    /// Whether the file was modified within `window` of `now`
    ///
    /// Timestamps in the future count as recent.
    pub fn is_recent(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.last_modified {
            Some(modified) => match now.signed_duration_since(modified).to_std() {
                Ok(age) => age <= window,
                Err(_) => true,
            },
            None => false,
        }
    }

    /// Classify against the recent window and the last refresh, if any
    pub fn state(
        &self,
        now: DateTime<Utc>,
        window: Duration,
        last_refresh: Option<DateTime<Utc>>,
    ) -> FreshnessState {
        let Some(modified) = self.last_modified.filter(|_| self.exists) else {
            return FreshnessState::Unknown;
        };
        let after_refresh = last_refresh.map_or(true, |at| modified > at);
        if after_refresh && self.is_recent(now, window) {
            FreshnessState::RecentlyModified
        } else {
            FreshnessState::Fresh
        }
    }
}

/// Probe every tracked file; touches nothing but file metadata
pub fn check_freshness(tracked: &TrackedFileSet) -> FreshnessReport {
    tracked
        .files()
        .iter()
        .map(|path| (path.clone(), FileFreshness::probe(path)))
        .collect()
}
