//! Fixed catalogue of cached datasets
//!
//! Every dataset has one canonical name (its cache operation name), a
//! backing file, and a default fingerprint policy: large tables use mtime,
//! small lookup files use a content hash.

use crate::cache::FingerprintPolicy;
use crate::error::CacheError;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Whether a dataset is a data table or a lookup mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Large tabular file under the data directory
    Table,
    /// Small lookup file under the lookup directory
    Mapping,
}

/// Known datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dataset {
    /// Weekly petroleum status, pivoted by series
    WpsPivot,
    /// Weekly petroleum status, long format
    Wps,
    /// Seasonality bands per series
    Seasonality,
    /// Line chart series
    Line,
    /// Short-term energy outlook, pivoted
    SteoPivot,
    /// STEO drilling productivity
    SteoDpr,
    /// STEO drilling productivity, other regions
    SteoDprOther,
    /// Company level imports
    CompanyImports,
    /// Company level crude imports
    CompanyCrudeImports,
    /// Drilling productivity id to region mapping
    DprMapping,
    /// STEO series mapping
    SteoMapping,
    /// Drilling productivity (other) mapping
    DprOtherMapping,
}

impl Dataset {
    /// Canonical name, also used as the cache operation name
    pub fn name(&self) -> &'static str {
        match self {
            Self::WpsPivot => "wps_pivot",
            Self::Wps => "wps",
            Self::Seasonality => "seasonality",
            Self::Line => "line",
            Self::SteoPivot => "steo_pivot",
            Self::SteoDpr => "steo_dpr",
            Self::SteoDprOther => "steo_dpr_other",
            Self::CompanyImports => "company_imports",
            Self::CompanyCrudeImports => "company_crude_imports",
            Self::DprMapping => "dpr_mapping",
            Self::SteoMapping => "steo_mapping",
            Self::DprOtherMapping => "dpr_other_mapping",
        }
    }

    /// Table or mapping
    pub fn kind(&self) -> DatasetKind {
        match self {
            Self::DprMapping | Self::SteoMapping | Self::DprOtherMapping => DatasetKind::Mapping,
            _ => DatasetKind::Table,
        }
    }

    /// Backing file, relative to the data or lookup directory
    pub fn relative_path(&self) -> &'static str {
        match self {
            Self::WpsPivot => "wps/wps_gte_2015_pivot.feather",
            Self::Wps => "wps/wps_gte_2015.feather",
            Self::Seasonality => "wps/seasonality_data.feather",
            Self::Line => "wps/graph_line_data.feather",
            Self::SteoPivot => "steo/steo_pivot.feather",
            Self::SteoDpr => "steo/steo_pivot_dpr.feather",
            Self::SteoDprOther => "steo/steo_pivot_dpr_other.feather",
            Self::CompanyImports => "cli/companylevelimports.parquet",
            Self::CompanyCrudeImports => "cli/companylevelimports_crude.parquet",
            Self::DprMapping => "steo/mapping_dpr.csv",
            Self::SteoMapping => "steo/mapping.csv",
            Self::DprOtherMapping => "steo/mapping_dpr_other.csv",
        }
    }

    /// Optional datasets load as empty when their file is missing
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::CompanyImports | Self::CompanyCrudeImports)
    }

    /// Fingerprint policy used unless configuration overrides it
    pub fn default_fingerprint(&self) -> FingerprintPolicy {
        match self.kind() {
            DatasetKind::Table => FingerprintPolicy::Mtime,
            DatasetKind::Mapping => FingerprintPolicy::Content,
        }
    }

    /// All datasets in preload order
    pub fn all() -> &'static [Self] {
        &[
            Self::WpsPivot,
            Self::Wps,
            Self::Seasonality,
            Self::Line,
            Self::SteoPivot,
            Self::SteoDpr,
            Self::SteoDprOther,
            Self::CompanyImports,
            Self::CompanyCrudeImports,
            Self::DprMapping,
            Self::SteoMapping,
            Self::DprOtherMapping,
        ]
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|d| d.name() == s)
            .ok_or_else(|| CacheError::UnknownDataset(s.to_string()))
    }
}

/// Root directories the catalogue paths are resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Directory holding data tables
    pub data_dir: PathBuf,
    /// Directory holding lookup mappings
    pub lookup_dir: PathBuf,
    overrides: HashMap<Dataset, PathBuf>,
}

impl DataPaths {
    /// Create from the two root directories
    pub fn new(data_dir: impl Into<PathBuf>, lookup_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lookup_dir: lookup_dir.into(),
            overrides: HashMap::new(),
        }
    }

    /// Point a dataset at a different file
    ///
    /// Relative paths are resolved against the dataset's root directory.
    pub fn with_override(mut self, dataset: Dataset, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(dataset, path.into());
        self
    }

    /// Path of a dataset's backing file
    pub fn resolve(&self, dataset: Dataset) -> PathBuf {
        let root: &Path = match dataset.kind() {
            DatasetKind::Table => &self.data_dir,
            DatasetKind::Mapping => &self.lookup_dir,
        };
        match self.overrides.get(&dataset) {
            Some(path) => root.join(path),
            None => root.join(dataset.relative_path()),
        }
    }
}

/// Fixed list of files reported on by freshness checks
///
/// Independent of which fingerprint policy a dataset uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedFileSet {
    files: Vec<PathBuf>,
}

impl TrackedFileSet {
    /// Track an explicit list of files
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Track the backing file of every catalogued dataset
    pub fn from_catalog(paths: &DataPaths) -> Self {
        Self::new(Dataset::all().iter().map(|d| paths.resolve(*d)).collect())
    }

    /// Tracked files in order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of tracked files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
