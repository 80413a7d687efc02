//! Two-tier record cache.
//!
//! Records a build pass will revisit (everything on the current record's
//! ancestor chain, plus explicitly persisted lookups) go into an
//! unbounded persistent tier; records touched incidentally during query
//! iteration go into a bounded LRU tier and may be evicted. Both tiers
//! key on `path` or `path+alt`, and a persistent entry always wins over
//! an ephemeral one so promotion is one-directional.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

use crate::record::{Record, SharedRecord, PRIMARY_ALT};

/// Default bound for the ephemeral tier.
pub const DEFAULT_EPHEMERAL_CACHE_SIZE: usize = 500;

/// Cache key for a record identity.
fn cache_key(path: &str, alt: &str) -> String {
    if alt == PRIMARY_ALT {
        path.to_string()
    } else {
        format!("{path}+{alt}")
    }
}

struct CacheState {
    persistent: HashMap<String, SharedRecord>,
    ephemeral: LruCache<String, SharedRecord>,
}

/// Per-pad record cache with a persistent and a bounded ephemeral tier.
pub struct RecordCache {
    state: Mutex<CacheState>,
}

impl RecordCache {
    pub fn new(ephemeral_size: usize) -> Self {
        let capacity = NonZeroUsize::new(ephemeral_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                persistent: HashMap::new(),
                ephemeral: LruCache::new(capacity),
            }),
        }
    }

    /// Look up a record. A persistent hit shadows any ephemeral entry;
    /// an ephemeral hit refreshes its recency.
    pub fn get(&self, path: &str, alt: &str) -> Option<SharedRecord> {
        let key = cache_key(path, alt);
        let mut state = self.state.lock();
        if let Some(record) = state.persistent.get(&key) {
            return Some(record.clone());
        }
        state.ephemeral.get(&key).cloned()
    }

    /// Put a record into the ephemeral tier unless it is already held
    /// persistently.
    pub fn remember(&self, record: &SharedRecord) {
        let key = cache_key(&record.path(), &record.alt());
        let mut state = self.state.lock();
        if state.persistent.contains_key(&key) {
            return;
        }
        state.ephemeral.put(key, record.clone());
    }

    /// Put a record into the persistent tier, removing any ephemeral
    /// entry for the same key.
    pub fn persist(&self, record: &SharedRecord) {
        let key = cache_key(&record.path(), &record.alt());
        let mut state = self.state.lock();
        state.ephemeral.pop(&key);
        state.persistent.insert(key, record.clone());
    }

    /// Promote a record to the persistent tier, but only if the cache
    /// currently holds it in either tier. Used before field mutation so
    /// edits on cached records cannot be lost to eviction, while records
    /// the cache never saw stay uncached.
    pub fn persist_if_cached(&self, record: &SharedRecord) {
        let key = cache_key(&record.path(), &record.alt());
        let mut state = self.state.lock();
        if state.persistent.contains_key(&key) || state.ephemeral.contains(&key) {
            state.ephemeral.pop(&key);
            state.persistent.insert(key, record.clone());
        }
    }

    /// Whether this exact record object is held persistently.
    pub fn is_persistent(&self, record: &SharedRecord) -> bool {
        let key = cache_key(&record.path(), &record.alt());
        self.state
            .lock()
            .persistent
            .get(&key)
            .is_some_and(|cached| Arc::ptr_eq(cached, record))
    }

    /// Whether any record is held persistently under this identity.
    pub fn is_persistent_key(&self, path: &str, alt: &str) -> bool {
        let key = cache_key(path, alt);
        self.state.lock().persistent.contains_key(&key)
    }

    /// Drop everything from both tiers.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        let persistent = state.persistent.len();
        let ephemeral = state.ephemeral.len();
        state.persistent.clear();
        state.ephemeral.clear();
        debug!(persistent, ephemeral, "flushed record cache");
    }
}

/// Silence the non-Debug `LruCache` field.
impl std::fmt::Debug for RecordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RecordCache")
            .field("persistent", &state.persistent.len())
            .field("ephemeral", &state.ephemeral.len())
            .finish()
    }
}
