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

//! Parse result cache keyed by raw source text

use super::driver::{CacheDriver, MemoryCacheDriver};
use super::stats::CacheStats;
use crate::ast::{Expression, Path};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Default number of entries for the process-wide caches
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Cache of parsed values keyed by the verbatim raw string
///
/// Parsed values are shared as `Arc<V>`; a hit returns the same allocation
/// as the original parse. Failed parses are never stored.
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::cache::ParseCache;
/// use octofhir_datapath::parser::parse_path;
/// use std::sync::Arc;
///
/// let cache = ParseCache::new(16);
/// let first = cache.get_or_parse("a.b", parse_path).unwrap();
/// let second = cache.get_or_parse("a.b", parse_path).unwrap();
///
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.stats().hits, 1);
/// ```
pub struct ParseCache<V> {
    driver: Box<dyn CacheDriver<Arc<V>>>,
}

impl<V: Send + Sync + 'static> ParseCache<V> {
    /// In-memory LRU cache with `capacity` entries; 0 disables caching
    pub fn new(capacity: usize) -> Self {
        Self::with_driver(Box::new(MemoryCacheDriver::new(capacity)))
    }

    /// Cache backed by a custom driver
    pub fn with_driver(driver: Box<dyn CacheDriver<Arc<V>>>) -> Self {
        Self { driver }
    }

    /// Return the cached value for `raw`, parsing and storing it on a miss
    pub fn get_or_parse<E, F>(&self, raw: &str, parse: F) -> Result<Arc<V>, E>
    where
        F: FnOnce(&str) -> Result<V, E>,
    {
        if let Some(cached) = self.driver.get(raw) {
            return Ok(cached);
        }
        let parsed = Arc::new(parse(raw)?);
        self.driver.set(raw, parsed.clone(), None);
        Ok(parsed)
    }

    /// Whether `raw` is currently cached
    pub fn contains(&self, raw: &str) -> bool {
        self.driver.has(raw)
    }

    /// Drop every entry and reset statistics
    pub fn clear(&self) {
        self.driver.clear();
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        self.driver.stats()
    }
}

impl<V> fmt::Debug for ParseCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseCache")
            .field("stats", &self.driver.stats())
            .finish()
    }
}

static PATH_CACHE: Lazy<Arc<ParseCache<Path>>> =
    Lazy::new(|| Arc::new(ParseCache::new(DEFAULT_CACHE_SIZE)));

static EXPRESSION_CACHE: Lazy<Arc<ParseCache<Expression>>> =
    Lazy::new(|| Arc::new(ParseCache::new(DEFAULT_CACHE_SIZE)));

/// Process-wide path cache used by default accessors and mutators
pub fn global_path_cache() -> Arc<ParseCache<Path>> {
    PATH_CACHE.clone()
}

/// Process-wide expression cache used by default mapping engines
pub fn global_expression_cache() -> Arc<ParseCache<Expression>> {
    EXPRESSION_CACHE.clone()
}

/// Clear both process-wide caches and their statistics
pub fn reset_global_caches() {
    log::debug!("resetting global parse caches");
    PATH_CACHE.clear();
    EXPRESSION_CACHE.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{PathError, parse_path};

    #[test]
    fn test_hit_returns_same_allocation() {
        let cache = ParseCache::new(8);
        let first = cache.get_or_parse("orders.*.id", parse_path).unwrap();
        let second = cache.get_or_parse("orders.*.id", parse_path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    }

    #[test]
    fn test_key_is_verbatim() {
        let cache = ParseCache::new(8);
        cache.get_or_parse("a.b", parse_path).unwrap();
        cache.get_or_parse("a.b ", parse_path).unwrap();
        assert_eq!(cache.stats().size, 2);
    }

    #[test]
    fn test_zero_capacity_parses_every_time() {
        let cache = ParseCache::new(0);
        let first = cache.get_or_parse("a", parse_path).unwrap();
        let second = cache.get_or_parse("a", parse_path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: ParseCache<Path> = ParseCache::new(8);
        let result: Result<_, PathError> = cache.get_or_parse("a..b", parse_path);
        assert!(result.is_err());
        assert!(!cache.contains("a..b"));
    }

    #[test]
    fn test_eviction_is_lru() {
        let cache = ParseCache::new(2);
        cache.get_or_parse("a", parse_path).unwrap();
        cache.get_or_parse("b", parse_path).unwrap();
        cache.get_or_parse("a", parse_path).unwrap();
        cache.get_or_parse("c", parse_path).unwrap();
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }
}
