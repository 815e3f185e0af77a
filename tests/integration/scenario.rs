//! End-to-end cache behaviour through the public library API

use freshcache::cache::{memoize, CacheStore, ManualClock, MemoPolicy, Ttl};
use freshcache::data::{DataCache, DataPaths, Dataset, DatasetLoader, FileLoader, Mapping, Table};
use freshcache::orchestration::Orchestrator;
use freshcache::CacheResult;
use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

#[derive(Default)]
struct CountingLoader {
    tables: AtomicUsize,
}

impl DatasetLoader for CountingLoader {
    fn load_table(&self, dataset: Dataset, path: &Path) -> CacheResult<Table> {
        self.tables.fetch_add(1, Ordering::SeqCst);
        FileLoader.load_table(dataset, path)
    }

    fn load_mapping(&self, dataset: Dataset, path: &Path) -> CacheResult<Mapping> {
        FileLoader.load_mapping(dataset, path)
    }
}

fn set_mtime(path: &Path, secs: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

#[tokio::test]
async fn pivot_reloads_on_change_and_refresh_repopulates() {
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::new(dir.path(), dir.path()).with_override(Dataset::WpsPivot, "data.bin");
    let data = paths.resolve(Dataset::WpsPivot);
    fs::write(&data, b"v1").unwrap();
    set_mtime(&data, 1_700_000_000);

    let loader = Arc::new(CountingLoader::default());
    let cache = Arc::new(DataCache::new(
        Arc::new(CacheStore::new()),
        loader.clone(),
        paths,
    ));
    let orchestrator = Orchestrator::new(cache.clone());

    // Miss, then hit
    let v1 = cache.wps_pivot().unwrap();
    let again = cache.wps_pivot().unwrap();
    assert_eq!(loader.tables.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&v1, &again));

    // Modified file: miss under a new key, old entry orphaned
    fs::write(&data, b"v2 is longer").unwrap();
    set_mtime(&data, 1_700_000_100);
    let v2 = cache.wps_pivot().unwrap();
    assert_eq!(loader.tables.load(Ordering::SeqCst), 2);
    assert_ne!(v1.size_bytes(), v2.size_bytes());
    assert_eq!(cache.store().len(), 2);

    // Refresh drops the orphan and preloads
    orchestrator.refresh_all().await;
    let keys = cache.store().keys();
    assert!(keys.iter().any(|k| k.operation() == "wps_pivot"));
    assert_eq!(
        keys.iter().filter(|k| k.operation() == "wps_pivot").count(),
        1
    );

    let loads = loader.tables.load(Ordering::SeqCst);
    let v3 = cache.wps_pivot().unwrap();
    assert_eq!(loader.tables.load(Ordering::SeqCst), loads);
    assert_eq!(v3.size_bytes(), v2.size_bytes());
}

#[test]
fn clear_forces_every_accessor_to_reload() {
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::new(dir.path(), dir.path()).with_override(Dataset::Wps, "wps.csv");
    fs::write(paths.resolve(Dataset::Wps), "period,id,value\n").unwrap();

    let loader = Arc::new(CountingLoader::default());
    let cache = DataCache::new(Arc::new(CacheStore::new()), loader.clone(), paths);

    cache.wps().unwrap();
    cache.store().clear();
    assert!(cache.store().keys().is_empty());

    cache.wps().unwrap();
    assert_eq!(loader.tables.load(Ordering::SeqCst), 2);
}

#[test]
fn ttl_memoization_expires_with_the_clock() {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(CacheStore::with_clock(clock.clone()));
    let calls = AtomicUsize::new(0);

    let memo = memoize(
        store,
        "region_totals",
        MemoPolicy::ttl(Ttl::For(Duration::from_secs(5))),
        |region: &str| -> CacheResult<String> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(region.to_uppercase())
        },
    );

    assert_eq!(*memo.call("permian").unwrap(), "PERMIAN");
    memo.call("permian").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(6));
    memo.call("permian").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
