//! Loader seam between the cache and the files it fronts
//!
//! The cache treats loaders as arbitrary "compute a value" calls. Anything
//! that can turn a dataset file into a [`Table`] or [`Mapping`] can sit
//! behind the facade.

use super::catalog::Dataset;
use super::table::{is_delimited, Mapping, Table};
use crate::error::{CacheError, CacheResult};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Reads datasets from their backing files
pub trait DatasetLoader: Send + Sync {
    /// Load a data table
    fn load_table(&self, dataset: Dataset, path: &Path) -> CacheResult<Table>;

    /// Load a lookup mapping
    fn load_mapping(&self, dataset: Dataset, path: &Path) -> CacheResult<Mapping>;
}

/// Loader reading straight from the filesystem
///
/// CSV files are parsed; other formats are held as opaque payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    fn read(dataset: Dataset, path: &Path) -> CacheResult<Vec<u8>> {
        fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CacheError::PathNotFound(path.to_path_buf()),
            _ => CacheError::io(format!("reading {} from {}", dataset, path.display()), e),
        })
    }
}

impl DatasetLoader for FileLoader {
    fn load_table(&self, dataset: Dataset, path: &Path) -> CacheResult<Table> {
        let bytes = Self::read(dataset, path)?;
        debug!("Read {} bytes for {}", bytes.len(), dataset);

        if is_delimited(path) {
            Table::from_csv(&bytes).map_err(|e| CacheError::loader(dataset.name(), e.to_string()))
        } else {
            Ok(Table::opaque(bytes.len()))
        }
    }

    fn load_mapping(&self, dataset: Dataset, path: &Path) -> CacheResult<Mapping> {
        let bytes = Self::read(dataset, path)?;
        Mapping::from_csv(&bytes).map_err(|e| CacheError::loader(dataset.name(), e.to_string()))
    }
}
