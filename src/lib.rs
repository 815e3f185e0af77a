//! freshcache - file-fingerprinted data cache
//!
//! An in-process cache for expensive, file-backed dataset loads. Cached
//! values are keyed by a fingerprint of the files they were loaded from, so
//! an entry goes stale the moment its source changes on disk.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod orchestration;
pub mod stats;
pub mod ui;

pub use error::{CacheError, CacheResult};
