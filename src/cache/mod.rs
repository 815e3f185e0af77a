//! File-aware in-memory cache
//!
//! Caches the results of expensive loaders and treats a result as stale the
//! moment a file it depends on changes on disk.
//!
//! # Layers
//!
//! - [`store`] - keyed map with per-entry TTL and lazy expiry
//! - [`fingerprint`] - mtime and content-hash fingerprints of dependency files
//! - [`key`] - typed argument encoding and key construction
//! - [`memo`] - memoization policies built on the store
//!
//! # Key Shape
//!
//! | Part | Example | Present when |
//! |------|---------|--------------|
//! | operation | `wps_pivot` | always |
//! | arguments | `:region=PADD3` | the loader takes arguments |
//! | fingerprint | `@m1700000000000000000` | a file dependency exists |

pub mod clock;
pub mod fingerprint;
pub mod key;
pub mod memo;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fingerprint::{content_fingerprint, mtime_fingerprint, Fingerprint, FingerprintPolicy};
pub use key::{CacheKey, IdSet, KeyArgs, KeyParams};
pub use memo::{get_or_load, memoize, MemoPolicy, Memoized};
pub use store::{CacheEntry, CacheStore, CachedValue, Ttl};
