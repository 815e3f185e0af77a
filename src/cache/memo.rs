//! Memoization on top of the cache store
//!
//! Three policies share one mechanism: compute a key from the operation
//! name, the encoded arguments and an optional dependency fingerprint, then
//! return the stored value or run the loader and store its result.
//!
//! | Policy | Fingerprint | Typical use |
//! |--------|-------------|-------------|
//! | TTL | none | derived values with no file behind them |
//! | File | mtime of one file | large tables |
//! | Files | content hash of several files | small lookup files |
//!
//! A changed fingerprint yields a different key rather than an update in
//! place; the old entry is orphaned until the store is cleared. When a file
//! policy cannot fingerprint its dependencies at all, the loader runs on
//! every call and nothing is stored.
//!
//! There is no single-flight protection. Two concurrent misses on the same
//! key both run the loader and the last `set` wins.

use super::fingerprint::FingerprintPolicy;
use super::key::{CacheKey, KeyArgs};
use super::store::{CacheStore, Ttl};
use crate::error::CacheError;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a memoized function keys and expires its results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoPolicy {
    fingerprint: FingerprintPolicy,
    dependencies: Vec<PathBuf>,
    ttl: Ttl,
}

impl MemoPolicy {
    /// Cache until the TTL runs out
    pub fn ttl(ttl: Ttl) -> Self {
        Self {
            fingerprint: FingerprintPolicy::None,
            dependencies: Vec::new(),
            ttl,
        }
    }

    /// Cache until `path`'s modification time changes
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            fingerprint: FingerprintPolicy::Mtime,
            dependencies: vec![path.into()],
            ttl: Ttl::Forever,
        }
    }

    /// Cache until the content of any of `paths` changes
    pub fn files(paths: Vec<PathBuf>) -> Self {
        Self {
            fingerprint: FingerprintPolicy::Content,
            dependencies: paths,
            ttl: Ttl::Forever,
        }
    }

    /// Policy of the given kind over `paths`
    pub fn with_fingerprint(fingerprint: FingerprintPolicy, paths: Vec<PathBuf>) -> Self {
        Self {
            fingerprint,
            dependencies: paths,
            ttl: Ttl::Forever,
        }
    }

    /// Override the TTL
    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Fingerprint kind
    pub fn fingerprint(&self) -> FingerprintPolicy {
        self.fingerprint
    }

    /// Dependency files
    pub fn dependencies(&self) -> &[PathBuf] {
        &self.dependencies
    }

    /// Entry TTL
    pub fn entry_ttl(&self) -> Ttl {
        self.ttl
    }

    /// Key for `operation(args)` under the current dependency state
    pub fn key_for<A: KeyArgs + ?Sized>(&self, operation: &str, args: &A) -> CacheKey {
        let fingerprint = self.fingerprint.fingerprint(&self.dependencies);
        CacheKey::build(operation, args, &fingerprint)
    }

    /// Return the cached value for `operation(args)` or run `loader`
    ///
    /// Bypasses the store when a file policy finds no fingerprint.
    pub fn load<A, T, E, F>(
        &self,
        store: &CacheStore,
        operation: &str,
        args: &A,
        loader: F,
    ) -> Result<Arc<T>, E>
    where
        A: KeyArgs + ?Sized,
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let fingerprint = self.fingerprint.fingerprint(&self.dependencies);
        if self.fingerprint != FingerprintPolicy::None && !fingerprint.is_present() {
            debug!("No fingerprint for {}, loading uncached", operation);
            return loader().map(Arc::new);
        }

        let key = CacheKey::build(operation, args, &fingerprint);
        get_or_load(store, key, self.ttl, loader)
    }
}

/// Return the value under `key` or compute, store and return it
///
/// A loader error is passed through and nothing is stored. The loader runs
/// without the store lock held.
pub fn get_or_load<T, E, F>(store: &CacheStore, key: CacheKey, ttl: Ttl, loader: F) -> Result<Arc<T>, E>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> Result<T, E>,
{
    match store.get_typed::<T>(&key) {
        Ok(Some(value)) => {
            debug!("Cache hit: {}", key);
            return Ok(value);
        }
        Ok(None) => debug!("Cache miss: {}", key),
        Err(CacheError::TypeMismatch { .. }) => {
            warn!("Cache entry {} holds another type, reloading", key);
        }
        Err(e) => warn!("Cache lookup for {} failed: {}", key, e),
    }

    let value = Arc::new(loader()?);
    store.set_shared(key, value.clone(), ttl);
    Ok(value)
}

/// A loader bound to a store, operation name and policy
///
/// Calling it behaves like calling the loader, except repeated calls with
/// equal arguments and unchanged dependencies reuse the stored result.
pub struct Memoized<A: ?Sized, T, F> {
    store: Arc<CacheStore>,
    operation: String,
    policy: MemoPolicy,
    loader: F,
    _marker: PhantomData<fn(&A) -> T>,
}

impl<A, T, E, F> Memoized<A, T, F>
where
    A: KeyArgs + ?Sized,
    T: Send + Sync + 'static,
    F: Fn(&A) -> Result<T, E>,
{
    /// Call the memoized loader
    pub fn call(&self, args: &A) -> Result<Arc<T>, E> {
        self.policy
            .load(&self.store, &self.operation, args, || (self.loader)(args))
    }

    /// Key the next call with `args` would use
    pub fn key_for(&self, args: &A) -> CacheKey {
        self.policy.key_for(&self.operation, args)
    }

    /// Operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

/// Wrap `loader` so its results are cached in `store`
pub fn memoize<A, T, E, F>(
    store: Arc<CacheStore>,
    operation: impl Into<String>,
    policy: MemoPolicy,
    loader: F,
) -> Memoized<A, T, F>
where
    A: KeyArgs + ?Sized,
    T: Send + Sync + 'static,
    F: Fn(&A) -> Result<T, E>,
{
    Memoized {
        store,
        operation: operation.into(),
        policy,
        loader,
        _marker: PhantomData,
    }
}
