//! Keyed in-memory store with per-entry expiry
//!
//! Values are type-erased and shared behind `Arc`, never mutated after
//! insertion. Expired entries are evicted lazily: only `get` removes them,
//! so `keys()` may still list entries that a lookup would reject.

use super::clock::{Clock, SystemClock};
use super::key::CacheKey;
use crate::error::{CacheError, CacheResult};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Type-erased cached value
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// How long an entry stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Valid until explicitly removed
    #[default]
    Forever,
    /// Valid for a fixed duration after insertion
    For(Duration),
}

impl Ttl {
    /// Build from an optional number of seconds (`None` = forever)
    pub fn from_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) => Self::For(Duration::from_secs(secs)),
            None => Self::Forever,
        }
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forever => write!(f, "forever"),
            Self::For(d) => write!(f, "{}s", d.as_secs()),
        }
    }
}

/// A single stored value
#[derive(Clone)]
pub struct CacheEntry {
    value: CachedValue,
    created_at: Instant,
    ttl: Ttl,
}

impl CacheEntry {
    fn new(value: CachedValue, created_at: Instant, ttl: Ttl) -> Self {
        Self {
            value,
            created_at,
            ttl,
        }
    }

    /// Whether the entry has outlived its TTL at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Ttl::Forever => false,
            // An expiry past the end of representable time never comes
            Ttl::For(ttl) => self
                .created_at
                .checked_add(ttl)
                .is_some_and(|expires_at| now > expires_at),
        }
    }

    /// When the entry was inserted
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Entry TTL
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("created_at", &self.created_at)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Process-wide key/value store
///
/// A single mutex guards the map. It is held only for map bookkeeping, never
/// while a loader runs.
pub struct CacheStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Create an empty store using the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Look up a live entry, evicting it if expired
    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            entries.remove(key);
            debug!("Evicted expired entry {}", key);
            return None;
        }

        entries.get(key).map(|entry| Arc::clone(&entry.value))
    }

    /// Look up a live entry and downcast it to `T`
    ///
    /// Returns `TypeMismatch` if the key holds a value of another type.
    pub fn get_typed<T>(&self, key: &CacheKey) -> CacheResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .downcast::<T>()
                .map(Some)
                .map_err(|_| CacheError::TypeMismatch {
                    key: key.to_string(),
                }),
        }
    }

    /// Insert or overwrite an entry, resetting its creation time
    pub fn set<T>(&self, key: CacheKey, value: T, ttl: Ttl)
    where
        T: Send + Sync + 'static,
    {
        self.set_shared(key, Arc::new(value), ttl);
    }

    /// Insert an already shared value
    pub fn set_shared(&self, key: CacheKey, value: CachedValue, ttl: Ttl) {
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        self.entries.lock().insert(key, entry);
    }

    /// Remove one entry; missing keys are ignored
    pub fn invalidate(&self, key: &CacheKey) {
        if self.entries.lock().remove(key).is_some() {
            debug!("Invalidated {}", key);
        }
    }

    /// Remove every entry produced by `operation`, whatever its fingerprint
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_operation(&self, operation: &str) -> usize {
        let removed = self.invalidate_where(|key| key.operation() == operation);
        debug!("Invalidated {} entries for {}", removed, operation);
        removed
    }

    /// Remove every entry whose key matches `predicate`
    pub fn invalidate_where<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&CacheKey) -> bool,
    {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        before - entries.len()
    }

    /// Remove all entries
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        debug!("Cleared {} entries", count);
    }

    /// Snapshot of current keys, possibly including expired ones
    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Number of stored entries, including not-yet-evicted expired ones
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}
