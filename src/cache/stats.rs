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

//! Cache statistics

use std::fmt;

/// Snapshot of a cache's counters
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::cache::CacheStats;
///
/// let stats = CacheStats { hits: 3, misses: 1, size: 1, max_size: 10 };
/// assert_eq!(stats.hit_ratio(), 75.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of lookups that found an entry
    pub hits: u64,
    /// Number of lookups that found nothing
    pub misses: u64,
    /// Entries currently stored
    pub size: usize,
    /// Maximum number of entries, 0 when caching is disabled
    pub max_size: usize,
}

impl CacheStats {
    /// Calculate hit ratio as percentage
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Fill level as percentage of `max_size`
    pub fn utilization_percentage(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            (self.size as f64 / self.max_size as f64) * 100.0
        }
    }

    /// Whether the cache stores anything at all
    pub fn is_enabled(&self) -> bool {
        self.max_size > 0
    }

    /// Format statistics for display
    pub fn format_summary(&self) -> String {
        if !self.is_enabled() {
            return "Cache: Disabled".to_string();
        }
        format!(
            "Cache: {}/{} entries ({:.1}% full) - {} hits, {} misses ({:.1}% hit ratio)",
            self.size,
            self.max_size,
            self.utilization_percentage(),
            self.hits,
            self.misses,
            self.hit_ratio()
        )
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_summary())
    }
}
