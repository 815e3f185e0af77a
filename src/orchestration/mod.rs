//! Orchestration of the data cache
//!
//! Provides the operational control surface:
//! - preload: warm every dataset, isolating per-dataset failures
//! - refresh: clear the store, then preload
//! - freshness: stat the tracked files without touching the cache
//! - auto-refresh: refresh when a tracked file was modified recently
//! - watch: run auto-refresh on a timer until shut down

mod freshness;

pub use freshness::{check_freshness, FileFreshness, FreshnessReport, FreshnessState};

use crate::cache::CacheStore;
use crate::config::{CacheConfig, Config};
use crate::data::{DataCache, Dataset, FileLoader, TrackedFileSet};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of warming one dataset
#[derive(Debug, Clone, Serialize)]
pub struct PreloadOutcome {
    pub dataset: Dataset,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    /// Failed for a reason the next load may not hit again
    pub retryable: bool,
}

impl PreloadOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-dataset results of a preload
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreloadReport {
    pub outcomes: Vec<PreloadOutcome>,
    pub elapsed_ms: u64,
}

impl PreloadReport {
    /// Datasets that loaded
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &PreloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Whether every dataset loaded
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(PreloadOutcome::is_ok)
    }
}

/// Timing of the periodic freshness watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    pub interval: Duration,
    pub window: Duration,
    pub cooldown: Duration,
}

impl WatchSettings {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.watch_interval_secs.max(1)),
            window: Duration::from_secs(config.recent_window_secs),
            cooldown: Duration::from_secs(config.refresh_cooldown_secs),
        }
    }
}

/// Drives preload, refresh and freshness checks for one facade
pub struct Orchestrator {
    cache: Arc<DataCache>,
    tracked: TrackedFileSet,
    parallel: bool,
    last_refresh: Mutex<Option<RefreshMark>>,
}

#[derive(Debug, Clone, Copy)]
struct RefreshMark {
    at: Instant,
    wall: DateTime<Utc>,
}

impl Orchestrator {
    /// Orchestrator over `cache`, tracking every catalogued file
    pub fn new(cache: Arc<DataCache>) -> Self {
        let tracked = cache.tracked_files();
        Self {
            cache,
            tracked,
            parallel: true,
            last_refresh: Mutex::new(None),
        }
    }

    /// Track an explicit file list instead of the catalogue
    pub fn with_tracked(mut self, tracked: TrackedFileSet) -> Self {
        self.tracked = tracked;
        self
    }

    /// Warm datasets concurrently or one after another
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Composition root: store, filesystem loader and facade from `config`
    pub fn from_config(config: &Config) -> Self {
        let store = Arc::new(CacheStore::new());
        let cache = DataCache::from_config(store, Arc::new(FileLoader), config);
        Self::new(Arc::new(cache)).with_parallel(config.cache.parallel_preload)
    }

    pub fn cache(&self) -> &Arc<DataCache> {
        &self.cache
    }

    pub fn tracked(&self) -> &TrackedFileSet {
        &self.tracked
    }

    /// Wall-clock time of the last refresh, if any
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh.lock().map(|mark| mark.wall)
    }

    /// Warm every dataset once; failures are logged and reported, never raised
    pub async fn preload_all(&self) -> PreloadReport {
        let started = Instant::now();

        let outcomes = if self.parallel {
            let tasks = Dataset::all().iter().map(|&dataset| {
                let cache = self.cache.clone();
                async move {
                    tokio::task::spawn_blocking(move || warm(&cache, dataset))
                        .await
                        .unwrap_or_else(|e| PreloadOutcome {
                            dataset,
                            elapsed_ms: 0,
                            error: Some(format!("preload task failed: {}", e)),
                            retryable: false,
                        })
                }
            });
            join_all(tasks).await
        } else {
            let cache = self.cache.clone();
            tokio::task::spawn_blocking(move || {
                Dataset::all()
                    .iter()
                    .map(|&d| warm(&cache, d))
                    .collect::<Vec<_>>()
            })
            .await
            .unwrap_or_else(|e| {
                warn!("Sequential preload failed: {}", e);
                Vec::new()
            })
        };

        let report = PreloadReport {
            outcomes,
            elapsed_ms: elapsed_ms(started),
        };
        info!(
            "Preloaded {}/{} datasets in {}ms",
            report.succeeded(),
            report.outcomes.len(),
            report.elapsed_ms
        );
        report
    }

    /// Clear the store, then preload everything
    pub async fn refresh_all(&self) -> PreloadReport {
        let mark = RefreshMark {
            at: Instant::now(),
            wall: Utc::now(),
        };
        info!("Refreshing cache ({} entries)", self.cache.store().len());
        self.cache.store().clear();
        *self.last_refresh.lock() = Some(mark);
        self.preload_all().await
    }

    /// Empty the store without reloading
    pub fn clear(&self) {
        self.cache.store().clear();
    }

    /// Stat every tracked file; does not touch the cache
    pub fn check_freshness(&self) -> FreshnessReport {
        check_freshness(&self.tracked)
    }

    /// Refresh if a tracked file changed within `window` and after the last refresh
    ///
    /// Returns whether a refresh ran.
    pub async fn auto_refresh_if_needed(&self, window: Duration) -> bool {
        let now = Utc::now();
        let last = self.last_refresh();
        let report = self.check_freshness();
        let changed: Vec<_> = report
            .iter()
            .filter(|(_, f)| f.state(now, window, last) == FreshnessState::RecentlyModified)
            .map(|(path, _)| path)
            .collect();

        if changed.is_empty() {
            debug!("No tracked file modified in the last {}s", window.as_secs());
            return false;
        }

        for path in &changed {
            info!("Recently modified: {}", path.display());
        }
        let report = self.refresh_all().await;
        for failure in report.failures() {
            warn!(
                "Refresh of {} failed: {}",
                failure.dataset,
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
        true
    }

    fn in_cooldown(&self, cooldown: Duration) -> bool {
        self.last_refresh
            .lock()
            .is_some_and(|mark| mark.at.elapsed() < cooldown)
    }

    /// Check freshness every `interval` until `shutdown` turns true
    ///
    /// Refreshes are skipped while inside the cooldown of the previous one.
    pub async fn watch(&self, settings: WatchSettings, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Watching {} files every {}s",
            self.tracked.len(),
            settings.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(settings.interval);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if self.in_cooldown(settings.cooldown) {
                        debug!("Refresh cooldown active, skipping check");
                        continue;
                    }
                    self.auto_refresh_if_needed(settings.window).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Watch stopped");
    }

    /// Run [`Orchestrator::watch`] on a background task
    pub fn spawn_watch(
        self: Arc<Self>,
        settings: WatchSettings,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.watch(settings, shutdown).await })
    }
}

fn warm(cache: &DataCache, dataset: Dataset) -> PreloadOutcome {
    let started = Instant::now();
    let (error, retryable) = match cache.warm(dataset) {
        Ok(()) => {
            debug!("Preloaded {}", dataset);
            (None, false)
        }
        Err(e) => {
            warn!("Preload of {} failed: {}", dataset, e);
            (Some(e.to_string()), e.is_retryable())
        }
    };
    PreloadOutcome {
        dataset,
        elapsed_ms: elapsed_ms(started),
        error,
        retryable,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
