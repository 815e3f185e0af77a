//! Dataset catalogue and the cached facade in front of it

pub mod catalog;
pub mod facade;
pub mod loader;
pub mod table;

pub use catalog::{DataPaths, Dataset, DatasetKind, TrackedFileSet};
pub use facade::DataCache;
pub use loader::{DatasetLoader, FileLoader};
pub use table::{Mapping, Table};
