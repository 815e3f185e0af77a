//! Store and freshness summary for operational output

use crate::cache::{CacheKey, CacheStore};
use crate::data::TrackedFileSet;
use crate::orchestration::{check_freshness, FreshnessReport};
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time summary of the cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    /// Sorted; may include expired entries not yet evicted
    pub keys: Vec<CacheKey>,
    /// Advisory limit from configuration, not enforced
    pub max_items: usize,
    pub tracked_files: FreshnessReport,
}

impl CacheStats {
    /// Entry count per operation, so orphaned fingerprints show up as counts above one
    pub fn operations(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for key in &self.keys {
            *counts.entry(key.operation().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Whether the store holds more entries than the advisory limit
    pub fn over_capacity(&self) -> bool {
        self.total_entries > self.max_items
    }

    /// Tracked files that exist
    pub fn files_present(&self) -> usize {
        self.tracked_files.values().filter(|f| f.exists).count()
    }
}

/// Collect stats without mutating the store
pub fn get_stats(store: &CacheStore, tracked: &TrackedFileSet, max_items: usize) -> CacheStats {
    let mut keys = store.keys();
    keys.sort();

    CacheStats {
        total_entries: keys.len(),
        keys,
        max_items,
        tracked_files: check_freshness(tracked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, Ttl};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_store() {
        let stats = get_stats(&CacheStore::new(), &TrackedFileSet::default(), 500);
        assert_eq!(stats.total_entries, 0);
        assert!(stats.keys.is_empty());
        assert!(stats.tracked_files.is_empty());
        assert!(!stats.over_capacity());
    }

    #[test]
    fn counts_entries_per_operation() {
        let store = CacheStore::new();
        store.set(CacheKey::from("wps_pivot@m1"), 1u8, Ttl::Forever);
        store.set(CacheKey::from("wps_pivot@m2"), 2u8, Ttl::Forever);
        store.set(CacheKey::from("processed_dpr:region=Permian@m2"), 3u8, Ttl::Forever);

        let stats = get_stats(&store, &TrackedFileSet::default(), 2);

        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.keys[0].as_str(), "processed_dpr:region=Permian@m2");
        assert_eq!(stats.operations()["wps_pivot"], 2);
        assert_eq!(stats.operations()["processed_dpr"], 1);
        assert!(stats.over_capacity());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn reports_tracked_files() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("mapping.csv");
        fs::write(&present, "id,region\n").unwrap();
        let tracked = TrackedFileSet::new(vec![present.clone(), dir.path().join("gone.csv")]);

        let stats = get_stats(&CacheStore::new(), &tracked, 500);
        assert_eq!(stats.tracked_files.len(), 2);
        assert_eq!(stats.files_present(), 1);
        assert!(stats.tracked_files[&present].last_modified.is_some());

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_entries"], 0);
        assert_eq!(json["max_items"], 500);
    }

    #[test]
    fn keys_serialize_as_strings() {
        let store = CacheStore::new();
        store.set(CacheKey::from("steo_mapping@habc"), 1u8, Ttl::Forever);

        let stats = get_stats(&store, &TrackedFileSet::default(), 500);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["keys"][0], "steo_mapping@habc");
        assert_eq!(stats.operations()["steo_mapping"], 1);
    }
}
