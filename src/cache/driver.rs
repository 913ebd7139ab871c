// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cache driver abstraction and the in-memory LRU driver
//!
//! [`CacheDriver`] is the seam persistent backends plug into. The crate
//! only ships [`MemoryCacheDriver`], a thread-safe LRU with optional
//! per-entry time-to-live.

use super::stats::CacheStats;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Key/value cache backend
pub trait CacheDriver<V>: Send + Sync {
    /// Fetch a value, counting a hit or a miss
    fn get(&self, key: &str) -> Option<V>;

    /// Store a value, optionally expiring after `ttl`
    fn set(&self, key: &str, value: V, ttl: Option<Duration>);

    /// Whether a live entry exists, without touching statistics or recency
    fn has(&self, key: &str) -> bool;

    /// Remove an entry, returning whether it existed
    fn delete(&self, key: &str) -> bool;

    /// Drop every entry and reset statistics
    fn clear(&self);

    /// Current statistics
    fn stats(&self) -> CacheStats;
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
struct Inner<V> {
    /// `None` when the capacity is zero
    entries: Option<LruCache<String, Entry<V>>>,
    hits: u64,
    misses: u64,
}

/// Thread-safe in-memory LRU cache driver
///
/// A capacity of zero disables storage: every `get` is a miss and `set`
/// is a no-op.
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::cache::{CacheDriver, MemoryCacheDriver};
///
/// let cache = MemoryCacheDriver::new(2);
/// cache.set("a", 1, None);
/// cache.set("b", 2, None);
/// cache.get("a");
/// cache.set("c", 3, None);
///
/// assert!(cache.has("a"));
/// assert!(!cache.has("b"));
/// assert_eq!(cache.stats().hits, 1);
/// ```
#[derive(Debug)]
pub struct MemoryCacheDriver<V> {
    inner: Mutex<Inner<V>>,
    capacity: usize,
}

impl<V> MemoryCacheDriver<V> {
    /// Create a driver holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: NonZeroUsize::new(capacity).map(LruCache::new),
                hits: 0,
                misses: 0,
            }),
            capacity,
        }
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries, expired ones included until touched
    pub fn len(&self) -> usize {
        self.inner.lock().entries.as_ref().map_or(0, LruCache::len)
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send> CacheDriver<V> for MemoryCacheDriver<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        let found = match inner.entries.as_mut() {
            Some(entries) => match entries.peek(key).map(|entry| entry.is_expired(now)) {
                Some(true) => {
                    entries.pop(key);
                    log::trace!("cache entry '{key}' expired");
                    None
                }
                Some(false) => entries.get(key).map(|entry| entry.value.clone()),
                None => None,
            },
            None => None,
        };

        if found.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        found
    }

    fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let mut inner = self.inner.lock();
        let Some(entries) = inner.entries.as_mut() else {
            return;
        };
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        if let Some((evicted, _)) = entries.push(key.to_string(), entry)
            && evicted != key
        {
            log::debug!("cache full, evicted least recently used entry '{evicted}'");
        }
    }

    fn has(&self, key: &str) -> bool {
        let inner = self.inner.lock();
        let now = Instant::now();
        inner
            .entries
            .as_ref()
            .and_then(|entries| entries.peek(key))
            .is_some_and(|entry| !entry.is_expired(now))
    }

    fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        inner
            .entries
            .as_mut()
            .and_then(|entries| entries.pop(key))
            .is_some()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        if let Some(entries) = inner.entries.as_mut() {
            entries.clear();
        }
        inner.hits = 0;
        inner.misses = 0;
    }

    fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.as_ref().map_or(0, LruCache::len),
            max_size: self.capacity,
        }
    }
}
