//! Named dataset accessors backed by the cache
//!
//! Each accessor is one memoized loader. The dataset name is the cache
//! operation name, so every dataset has a single canonical key no matter
//! who asks for it. Derived accessors fold their parameters into the key
//! and share the fingerprint of the dataset they are derived from.

use super::catalog::{DataPaths, Dataset, DatasetKind, TrackedFileSet};
use super::loader::DatasetLoader;
use super::table::{Mapping, Table};
use crate::cache::{CacheStore, FingerprintPolicy, IdSet, KeyParams, MemoPolicy, Ttl};
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

const PROCESSED_DPR: &str = "processed_dpr";

/// Cached access to every catalogued dataset
pub struct DataCache {
    store: Arc<CacheStore>,
    loader: Arc<dyn DatasetLoader>,
    paths: DataPaths,
    policies: HashMap<Dataset, MemoPolicy>,
}

impl DataCache {
    /// Facade using each dataset's default policy and a forever TTL
    pub fn new(store: Arc<CacheStore>, loader: Arc<dyn DatasetLoader>, paths: DataPaths) -> Self {
        let policies = Dataset::all()
            .iter()
            .map(|d| {
                let policy = MemoPolicy::with_fingerprint(
                    d.default_fingerprint(),
                    vec![paths.resolve(*d)],
                );
                (*d, policy)
            })
            .collect();

        Self {
            store,
            loader,
            paths,
            policies,
        }
    }

    /// Facade with paths, TTLs and fingerprint policies taken from `config`
    pub fn from_config(
        store: Arc<CacheStore>,
        loader: Arc<dyn DatasetLoader>,
        config: &Config,
    ) -> Self {
        let mut paths = DataPaths::new(&config.data.data_dir, &config.data.lookup_dir);
        for (name, overrides) in &config.datasets {
            if let (Ok(dataset), Some(path)) = (Dataset::from_str(name), &overrides.path) {
                paths = paths.with_override(dataset, path);
            }
        }

        let mut cache = Self::new(store, loader, paths);
        let default_ttl = Ttl::from_secs(config.cache.default_ttl_secs);

        for dataset in Dataset::all() {
            let overrides = config.datasets.get(dataset.name());
            let fingerprint = overrides
                .and_then(|o| o.fingerprint)
                .unwrap_or_else(|| dataset.default_fingerprint());
            let ttl = overrides
                .and_then(|o| o.ttl_secs)
                .map(|secs| Ttl::from_secs(Some(secs)))
                .unwrap_or(default_ttl);
            cache = cache.with_policy(*dataset, fingerprint, ttl);
        }

        for name in config.datasets.keys() {
            if Dataset::from_str(name).is_err() {
                warn!("Ignoring settings for unknown dataset {}", name);
            }
        }

        cache
    }

    /// Override how one dataset is fingerprinted and expired
    pub fn with_policy(mut self, dataset: Dataset, fingerprint: FingerprintPolicy, ttl: Ttl) -> Self {
        let policy = MemoPolicy::with_fingerprint(fingerprint, self.dependencies(dataset))
            .with_ttl(ttl);
        self.policies.insert(dataset, policy);
        self
    }

    /// Shared store
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Resolved data paths
    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Every catalogued file, for freshness reporting
    pub fn tracked_files(&self) -> TrackedFileSet {
        TrackedFileSet::from_catalog(&self.paths)
    }

    /// Policy in force for a dataset
    pub fn policy(&self, dataset: Dataset) -> &MemoPolicy {
        &self.policies[&dataset]
    }

    fn dependencies(&self, dataset: Dataset) -> Vec<PathBuf> {
        vec![self.paths.resolve(dataset)]
    }

    /// Load a table dataset through the cache
    pub fn table(&self, dataset: Dataset) -> CacheResult<Arc<Table>> {
        if dataset.kind() != DatasetKind::Table {
            return Err(CacheError::User(format!("{} is a mapping, not a table", dataset)));
        }

        let path = self.paths.resolve(dataset);
        self.policy(dataset)
            .load(&self.store, dataset.name(), &(), || {
                if dataset.is_optional() && !path.exists() {
                    debug!("{} not present, using empty table", path.display());
                    return Ok(Table::default());
                }
                self.loader.load_table(dataset, &path)
            })
    }

    /// Load a mapping dataset through the cache
    pub fn mapping(&self, dataset: Dataset) -> CacheResult<Arc<Mapping>> {
        if dataset.kind() != DatasetKind::Mapping {
            return Err(CacheError::User(format!("{} is a table, not a mapping", dataset)));
        }

        let path = self.paths.resolve(dataset);
        self.policy(dataset)
            .load(&self.store, dataset.name(), &(), || {
                self.loader.load_mapping(dataset, &path)
            })
    }

    /// Load a dataset of either kind, discarding the value
    pub fn warm(&self, dataset: Dataset) -> CacheResult<()> {
        match dataset.kind() {
            DatasetKind::Table => self.table(dataset).map(|_| ()),
            DatasetKind::Mapping => self.mapping(dataset).map(|_| ()),
        }
    }

    /// Drop every cached entry of a dataset and the values derived from it,
    /// including orphaned ones
    pub fn invalidate(&self, dataset: Dataset) -> usize {
        let name = dataset.name();
        let feeds_dpr = matches!(dataset, Dataset::SteoDpr | Dataset::DprMapping);
        let removed = self.store.invalidate_where(|key| {
            let op = key.operation();
            op == name
                || op.strip_prefix(name).is_some_and(|rest| rest.starts_with('.'))
                || (feeds_dpr && op == PROCESSED_DPR)
        });
        debug!("Invalidated {} entries for {}", removed, dataset);
        removed
    }

    /// Weekly petroleum status, one column per series
    pub fn wps_pivot(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::WpsPivot)
    }

    /// Weekly petroleum status in long form
    pub fn wps(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::Wps)
    }

    /// Seasonality bands for the weekly series
    pub fn seasonality(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::Seasonality)
    }

    /// Precomputed line chart data
    pub fn line(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::Line)
    }

    /// Short-term energy outlook, one column per series
    pub fn steo_pivot(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::SteoPivot)
    }

    /// Drilling productivity by region
    pub fn steo_dpr(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::SteoDpr)
    }

    /// Drilling productivity for the remaining regions
    pub fn steo_dpr_other(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::SteoDprOther)
    }

    /// Company-level imports; empty when the file is missing
    pub fn company_imports(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::CompanyImports)
    }

    /// Company-level crude imports; empty when the file is missing
    pub fn company_crude_imports(&self) -> CacheResult<Arc<Table>> {
        self.table(Dataset::CompanyCrudeImports)
    }

    /// Drilling productivity id to region mapping
    pub fn dpr_mapping(&self) -> CacheResult<Arc<Mapping>> {
        self.mapping(Dataset::DprMapping)
    }

    /// Outlook series metadata
    pub fn steo_mapping(&self) -> CacheResult<Arc<Mapping>> {
        self.mapping(Dataset::SteoMapping)
    }

    /// Mapping for the remaining drilling productivity regions
    pub fn dpr_other_mapping(&self) -> CacheResult<Arc<Mapping>> {
        self.mapping(Dataset::DprOtherMapping)
    }

    /// Rows of a table on or after `start`; the whole table when `None`
    pub fn filtered(&self, dataset: Dataset, start: Option<NaiveDate>) -> CacheResult<Arc<Table>> {
        let Some(start) = start else {
            return self.table(dataset);
        };

        let operation = format!("{}.since", dataset);
        self.policy(dataset)
            .load(&self.store, &operation, &start, || {
                self.table(dataset)?.filter_since(start)
            })
    }

    /// Series subset of a table; id order does not affect the key
    pub fn rows_for_ids(&self, dataset: Dataset, ids: &IdSet) -> CacheResult<Arc<Table>> {
        let operation = format!("{}.ids", dataset);
        self.policy(dataset)
            .load(&self.store, &operation, ids, || {
                self.table(dataset)?.select_ids(ids.as_slice())
            })
    }

    /// Table rows matching every `column = value` parameter
    pub fn query(&self, dataset: Dataset, params: &KeyParams) -> CacheResult<Arc<Table>> {
        let operation = format!("{}.query", dataset);
        self.policy(dataset)
            .load(&self.store, &operation, params, || {
                self.table(dataset)?.filter_eq(params.iter())
            })
    }

    /// Drilling productivity melted by delivery month, optionally for one region
    ///
    /// Depends on both the productivity table and its region mapping; the
    /// mapping's fingerprint is folded into the arguments.
    pub fn processed_dpr(&self, region: Option<&str>) -> CacheResult<Arc<Table>> {
        let mapping_policy = self.policy(Dataset::DprMapping);
        let mapping_state = mapping_policy
            .fingerprint()
            .fingerprint(mapping_policy.dependencies())
            .to_string();

        let mut args = KeyParams::new().with("mapping", mapping_state);
        if let Some(region) = region {
            args = args.with("region", region);
        }

        self.policy(Dataset::SteoDpr)
            .load(&self.store, PROCESSED_DPR, &args, || {
                let dpr = self.steo_dpr()?;
                let mapping = self.dpr_mapping()?;
                dpr.melt_dpr(&mapping, region)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    /// Counts loads and delegates to the filesystem
    #[derive(Default)]
    struct CountingLoader {
        tables: AtomicUsize,
        mappings: AtomicUsize,
    }

    impl DatasetLoader for CountingLoader {
        fn load_table(&self, dataset: Dataset, path: &Path) -> CacheResult<Table> {
            self.tables.fetch_add(1, Ordering::SeqCst);
            crate::data::FileLoader.load_table(dataset, path)
        }

        fn load_mapping(&self, dataset: Dataset, path: &Path) -> CacheResult<Mapping> {
            self.mappings.fetch_add(1, Ordering::SeqCst);
            crate::data::FileLoader.load_mapping(dataset, path)
        }
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn fixture() -> (TempDir, DataCache, Arc<CountingLoader>) {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path().join("data"), dir.path().join("lookup"))
            .with_override(Dataset::WpsPivot, "wps/pivot.csv")
            .with_override(Dataset::SteoDpr, "steo/dpr.csv");

        let pivot = paths.resolve(Dataset::WpsPivot);
        fs::create_dir_all(pivot.parent().unwrap()).unwrap();
        fs::write(
            &pivot,
            "period,id,value\n2019-12-27,W_EPC0,1\n2020-01-03,W_EPC0,2\n2020-01-03,W_EPM0,3\n",
        )
        .unwrap();
        set_mtime(&pivot, 1_700_000_000);

        let dpr = paths.resolve(Dataset::SteoDpr);
        fs::create_dir_all(dpr.parent().unwrap()).unwrap();
        fs::write(
            &dpr,
            "id,name,release_date,uom,2024-01-01\nP1,Permian,2024-03,mb/d,10\nB1,Bakken,2024-03,mb/d,5\n",
        )
        .unwrap();

        let mapping = paths.resolve(Dataset::DprMapping);
        fs::create_dir_all(mapping.parent().unwrap()).unwrap();
        fs::write(&mapping, "id,region\nP1,Permian\nB1,Bakken\n").unwrap();

        let loader = Arc::new(CountingLoader::default());
        let cache = DataCache::new(Arc::new(CacheStore::new()), loader.clone(), paths);
        (dir, cache, loader)
    }

    #[test]
    fn accessor_hits_after_first_load() {
        let (_dir, cache, loader) = fixture();

        let first = cache.wps_pivot().unwrap();
        let second = cache.wps_pivot().unwrap();

        assert_eq!(loader.tables.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn touched_file_reloads() {
        let (_dir, cache, loader) = fixture();
        cache.wps_pivot().unwrap();

        set_mtime(&cache.paths().resolve(Dataset::WpsPivot), 1_700_000_060);
        cache.wps_pivot().unwrap();

        assert_eq!(loader.tables.load(Ordering::SeqCst), 2);
        assert_eq!(cache.store().len(), 2);
        assert_eq!(cache.invalidate(Dataset::WpsPivot), 2);
    }

    #[test]
    fn loader_failure_surfaces_and_is_not_cached() {
        let (_dir, cache, _loader) = fixture();

        let err = cache.wps().unwrap_err();
        assert!(matches!(err, CacheError::PathNotFound(_)));
        assert!(cache.store().is_empty());
    }

    #[test]
    fn optional_dataset_defaults_to_empty() {
        let (_dir, cache, loader) = fixture();

        let imports = cache.company_imports().unwrap();
        assert!(imports.is_empty());
        assert_eq!(loader.tables.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let (_dir, cache, _loader) = fixture();
        assert!(cache.table(Dataset::DprMapping).is_err());
        assert!(cache.mapping(Dataset::Wps).is_err());
    }

    #[test]
    fn filtered_reuses_base_table() {
        let (_dir, cache, loader) = fixture();
        let start = NaiveDate::from_ymd_opt(2020, 1, 1);

        let since = cache.filtered(Dataset::WpsPivot, start).unwrap();
        let again = cache.filtered(Dataset::WpsPivot, start).unwrap();
        let whole = cache.filtered(Dataset::WpsPivot, None).unwrap();

        assert_eq!(since.len(), 2);
        assert!(Arc::ptr_eq(&since, &again));
        assert_eq!(whole.len(), 3);
        assert_eq!(loader.tables.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn id_order_does_not_matter() {
        let (_dir, cache, _loader) = fixture();

        let a = cache
            .rows_for_ids(Dataset::WpsPivot, &IdSet::new(["W_EPM0", "W_EPC0"]))
            .unwrap();
        let b = cache
            .rows_for_ids(Dataset::WpsPivot, &IdSet::new(["W_EPC0", "W_EPM0"]))
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn query_params_are_order_independent() {
        let (_dir, cache, _loader) = fixture();

        let ab = KeyParams::new().with("id", "W_EPC0").with("period", "2020-01-03");
        let ba = KeyParams::new().with("period", "2020-01-03").with("id", "W_EPC0");
        let other = KeyParams::new().with("id", "W_EPM0").with("period", "2020-01-03");

        let first = cache.query(Dataset::WpsPivot, &ab).unwrap();
        let second = cache.query(Dataset::WpsPivot, &ba).unwrap();
        let third = cache.query(Dataset::WpsPivot, &other).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first.rows()[0][2], "2");
        assert_eq!(third.rows()[0][2], "3");
    }

    #[test]
    fn processed_dpr_tracks_mapping_content() {
        let (_dir, cache, loader) = fixture();

        let permian = cache.processed_dpr(Some("Permian")).unwrap();
        assert_eq!(permian.len(), 1);
        cache.processed_dpr(Some("Permian")).unwrap();
        assert_eq!(loader.mappings.load(Ordering::SeqCst), 1);

        fs::write(
            cache.paths().resolve(Dataset::DprMapping),
            "id,region\nP1,Permian\nB1,Permian\n",
        )
        .unwrap();

        let permian = cache.processed_dpr(Some("Permian")).unwrap();
        assert_eq!(permian.len(), 2);
        assert_eq!(loader.mappings.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidate_drops_derived_entries() {
        let (_dir, cache, _loader) = fixture();
        cache.wps_pivot().unwrap();
        cache
            .filtered(Dataset::WpsPivot, NaiveDate::from_ymd_opt(2020, 1, 1))
            .unwrap();
        cache.processed_dpr(None).unwrap();

        assert_eq!(cache.invalidate(Dataset::WpsPivot), 2);
        assert_eq!(cache.invalidate(Dataset::DprMapping), 2);
        assert_eq!(cache.store().len(), 1);
    }

    #[test]
    fn pure_ttl_policy_ignores_file_changes() {
        let (_dir, cache, loader) = fixture();
        let cache = cache.with_policy(Dataset::WpsPivot, FingerprintPolicy::None, Ttl::Forever);

        cache.wps_pivot().unwrap();
        set_mtime(&cache.paths().resolve(Dataset::WpsPivot), 1_700_000_999);
        cache.wps_pivot().unwrap();

        assert_eq!(loader.tables.load(Ordering::SeqCst), 1);
    }
}
